//! Snapshot Store
//!
//! Insertion-ordered, named collection of snapshots. Saving under an existing
//! name overwrites the stored snapshot and keeps its original position.

use crate::error::{HawkeyeError, HawkeyeResult};
use crate::snapshot::Snapshot;
use tracing::debug;

/// In-memory store for captured snapshots
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: Vec<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, replacing any snapshot with the same name
    pub fn save(&mut self, snapshot: Snapshot) {
        match self.snapshots.iter_mut().find(|s| s.name == snapshot.name) {
            Some(existing) => {
                debug!("Overwriting snapshot {}", snapshot.name);
                *existing = snapshot;
            }
            None => {
                debug!("Saved snapshot {} ({} probes)", snapshot.name, snapshot.payload.len());
                self.snapshots.push(snapshot);
            }
        }
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.name == name)
    }

    /// The most recent `n` snapshots, most recent first
    ///
    /// Fails without touching the store when fewer than `n` exist.
    pub fn last_n(&self, n: usize) -> HawkeyeResult<Vec<&Snapshot>> {
        if self.snapshots.len() < n {
            return Err(HawkeyeError::NoValidSnapshots {
                requested: n,
                available: self.snapshots.len(),
            });
        }
        Ok(self.snapshots.iter().rev().take(n).collect())
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshots.iter().map(|s| s.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot
    pub fn clear(&mut self) {
        debug!("Clearing {} snapshots", self.snapshots.len());
        self.snapshots.clear();
    }
}
