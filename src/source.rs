//! Probe Sources
//!
//! A source enumerates the probes available to a host. The host consumes
//! sources when it is built; how a source finds its probes (a compiled-in
//! list, a manifest of names) is up to the embedding application.

use crate::error::{assert_or, load_error, HawkeyeResult, ProbeError};
use crate::host::Hawkeye;
use crate::probe::Probe;
use crate::probes;
use std::fmt;
use std::sync::Arc;

/// Builds a probe for a host
pub type ProbeFactory = Arc<dyn Fn(&Hawkeye) -> Result<Box<dyn Probe>, ProbeError> + Send + Sync>;

/// A named, not yet instantiated probe
#[derive(Clone)]
pub struct ProbeCandidate {
    pub name: String,
    pub factory: ProbeFactory,
}

impl ProbeCandidate {
    pub fn new(name: impl Into<String>, factory: ProbeFactory) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }

    /// Instantiate the probe; failures name this candidate
    pub fn instantiate(&self, host: &Hawkeye) -> HawkeyeResult<Box<dyn Probe>> {
        (self.factory)(host).map_err(|e| load_error(&self.name, e.to_string()))
    }
}

impl fmt::Debug for ProbeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeCandidate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Enumerates candidate probes, in registration order
pub trait ProbeSource: Send + Sync {
    fn discover(&self) -> HawkeyeResult<Vec<ProbeCandidate>>;
}

/// Compiled-in list of probes
#[derive(Clone, Default)]
pub struct StaticProbeSource {
    candidates: Vec<ProbeCandidate>,
}

impl StaticProbeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a probe built by `factory`
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Hawkeye) -> Result<Box<dyn Probe>, ProbeError> + Send + Sync + 'static,
    {
        self.candidates.push(ProbeCandidate::new(name, Arc::new(factory)));
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl ProbeSource for StaticProbeSource {
    fn discover(&self) -> HawkeyeResult<Vec<ProbeCandidate>> {
        Ok(self.candidates.clone())
    }
}

/// Manifest of bundled probe names
#[derive(Debug, Clone, Default)]
pub struct CatalogProbeSource {
    names: Vec<String>,
}

impl CatalogProbeSource {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Every bundled probe
    pub fn all() -> Self {
        Self::new(probes::catalog().into_iter().map(|(name, _)| name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ProbeSource for CatalogProbeSource {
    fn discover(&self) -> HawkeyeResult<Vec<ProbeCandidate>> {
        self.names
            .iter()
            .map(|name| -> HawkeyeResult<ProbeCandidate> {
                let name = name.trim();
                assert_or(!name.is_empty(), "blank probe name in manifest", |reason| {
                    load_error(name, reason)
                })?;
                let factory = probes::factory(name)
                    .ok_or_else(|| load_error(name, "no such probe in the catalog"))?;
                Ok(ProbeCandidate::new(name, factory))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HawkeyeError;

    #[test]
    fn test_catalog_source_discovers_in_manifest_order() {
        let source = CatalogProbeSource::new(["Structure", "Count"]);
        let names: Vec<_> = source.discover().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Structure", "Count"]);
    }

    #[test]
    fn test_catalog_source_rejects_unknown_probe() {
        let err = CatalogProbeSource::new(["Count", "Bogus"]).discover().unwrap_err();
        assert!(matches!(err, HawkeyeError::PluginLoad { ref candidate, .. } if candidate == "Bogus"));
        assert!(err.to_string().starts_with("Could not load plugin Bogus"));
    }

    #[test]
    fn test_catalog_source_rejects_blank_name() {
        let err = CatalogProbeSource::new([" "]).discover().unwrap_err();
        assert!(matches!(err, HawkeyeError::PluginLoad { .. }));
    }

    #[test]
    fn test_catalog_all() {
        assert_eq!(CatalogProbeSource::all().names(), ["Count", "Checksum", "Structure"]);
    }

    #[test]
    fn test_static_source_keeps_order() {
        let source = StaticProbeSource::new()
            .with("b", |_| Err(ProbeError::Other("unused".into())))
            .with("a", |_| Err(ProbeError::Other("unused".into())));
        let names: Vec<_> = source.discover().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
