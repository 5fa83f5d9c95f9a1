//! Probe contract
//!
//! A probe captures one observable property of the database, compares two of
//! its own captures and renders the comparison. The host never looks inside
//! the values a probe produces.

use crate::config::ProbeConfig;
use crate::db::Database;
use crate::error::ProbeError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PATH_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+::").expect("static regex is valid"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("static regex is valid"));

/// Capability set every registered probe implements
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable identifier, derived from the implementing type by default
    fn name(&self) -> String {
        default_probe_name(std::any::type_name::<Self>())
    }

    /// Called once, right after the probe is added to a registry
    fn on_register(&mut self, _config: &ProbeConfig) {}

    /// Capture this probe's view of the database
    async fn capture(&self, db: &dyn Database, config: &ProbeConfig) -> Result<Value, ProbeError>;

    /// Compare two captures; must not depend on anything but its inputs
    fn compare(&self, before: &Value, after: &Value) -> Result<Value, ProbeError>;

    /// Human-readable, multi-line report of a comparison
    fn render(&self, diff: &Value) -> Result<String, ProbeError>;
}

/// Last path segment of a type name with every non-word character removed
///
/// `hawkeye_db::probes::RowCountProbe` becomes `RowCountProbe`, and generic
/// arguments collapse into the name (`Wrapper<u8>` becomes `Wrapperu8`).
pub fn default_probe_name(type_name: &str) -> String {
    let unqualified = PATH_PREFIX.replace_all(type_name, "");
    NON_WORD.replace_all(&unqualified, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    #[async_trait]
    impl Probe for Plain {
        async fn capture(&self, _db: &dyn Database, _config: &ProbeConfig) -> Result<Value, ProbeError> {
            Ok(Value::Null)
        }

        fn compare(&self, _before: &Value, _after: &Value) -> Result<Value, ProbeError> {
            Ok(Value::Null)
        }

        fn render(&self, _diff: &Value) -> Result<String, ProbeError> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_default_name_from_type() {
        assert_eq!(Plain.name(), "Plain");
        let boxed: Box<dyn Probe> = Box::new(Plain);
        assert_eq!(boxed.name(), "Plain");
    }

    #[test]
    fn test_capture_through_trait_object() {
        let db = crate::db::tests::FakeDatabase::with_tables(&[]);
        let boxed: Box<dyn Probe> = Box::new(Plain);
        let value = tokio_test::block_on(boxed.capture(&db, &ProbeConfig::new()));
        assert_eq!(value.unwrap(), Value::Null);
        assert!(db.executed().is_empty());
    }

    #[test]
    fn test_default_probe_name_strips_path_and_symbols() {
        assert_eq!(default_probe_name("hawkeye_db::probes::RowCountProbe"), "RowCountProbe");
        assert_eq!(default_probe_name("Count"), "Count");
        assert_eq!(default_probe_name("a::Wrapper<b::Inner>"), "WrapperInner");
        assert_eq!(default_probe_name("a::Pair<u8, i32>"), "Pairu8i32");
    }
}
