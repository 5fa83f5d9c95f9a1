//! Probe Registry
//!
//! Ordered name -> probe mapping. Insertion order is the broadcast order;
//! re-adding a name replaces the probe in place.

use crate::config::ProbeConfig;
use crate::error::{assert, HawkeyeResult};
use crate::probe::Probe;
use tracing::debug;

/// Registered probes, in insertion order
#[derive(Default)]
pub struct ProbeRegistry {
    entries: Vec<(String, Box<dyn Probe>)>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `probe` under `name` (or its own name) and call `on_register`
    ///
    /// An existing entry with the same name is replaced without any teardown
    /// call on the old probe.
    pub fn add(
        &mut self,
        probe: Box<dyn Probe>,
        name: Option<&str>,
        config: &ProbeConfig,
    ) -> HawkeyeResult<String> {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => probe.name(),
        };
        assert(!name.is_empty(), Some("Probe name must not be empty"))?;

        let index = match self.entries.iter().position(|(existing, _)| *existing == name) {
            Some(index) => {
                debug!("Replacing probe {}", name);
                self.entries[index].1 = probe;
                index
            }
            None => {
                debug!("Registering probe {}", name);
                self.entries.push((name.clone(), probe));
                self.entries.len() - 1
            }
        };
        self.entries[index].1.on_register(config);

        Ok(name)
    }

    /// Remove the probe registered under `name`; no-op if absent
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Probe>> {
        let position = self.entries.iter().position(|(existing, _)| existing == name)?;
        debug!("Removing probe {}", name);
        Some(self.entries.remove(position).1)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Probe> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, probe)| probe.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered `(name, probe)` pairs in broadcast order
    pub fn all(&self) -> impl Iterator<Item = (&str, &dyn Probe)> {
        self.entries
            .iter()
            .map(|(name, probe)| (name.as_str(), probe.as_ref()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
