//! Snapshot Module
//!
//! Point-in-time captures of every probe's payload, and the per-probe
//! comparison between two of them.

pub mod store;

pub use store::SnapshotStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named capture of all probes' payloads at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub name: String,
    pub captured_at: DateTime<Utc>,
    /// Probe name -> probe-defined value, in registry order
    pub payload: Map<String, Value>,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            captured_at: Utc::now(),
            payload,
        }
    }

    /// Payload captured by one probe
    pub fn get(&self, probe: &str) -> Option<&Value> {
        self.payload.get(probe)
    }

    pub fn probe_names(&self) -> impl Iterator<Item = &str> {
        self.payload.keys().map(String::as_str)
    }
}

/// Per-probe comparison results between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub before: String,
    pub after: String,
    /// Probe name -> probe-defined comparison, in registry order
    pub results: Map<String, Value>,
}

impl Diff {
    pub fn get(&self, probe: &str) -> Option<&Value> {
        self.results.get(probe)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Label used in error messages
    pub fn label(&self) -> String {
        format!("diff {}..{}", self.before, self.after)
    }
}
