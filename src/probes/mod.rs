//! Bundled probes
//!
//! Row counts, data checksums and table structure, each captured per table
//! of `ProbeConfig::tables`. All three share the per-table diff layout:
//!
//! ```text
//! { "<table>": { "changed": bool, "before": <value|null>, "after": <value|null> } }
//! ```

pub mod checksum;
pub mod row_count;
pub mod structure;

pub use checksum::ChecksumProbe;
pub use row_count::RowCountProbe;
pub use structure::StructureProbe;

use crate::error::ProbeError;
use crate::host::Hawkeye;
use crate::logger::EventLog;
use crate::probe::Probe;
use crate::source::ProbeFactory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Comparison of one table between two captures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub changed: bool,
    pub before: Value,
    pub after: Value,
}

/// Compare two `{table: value}` payloads over the tables of `after`
pub fn compare_tables(before: &Value, after: &Value) -> Result<Value, ProbeError> {
    let before = as_object(before, "before")?;
    let after = as_object(after, "after")?;

    let mut diff = Map::new();
    for (table, after_value) in after {
        let before_value = before.get(table).cloned().unwrap_or(Value::Null);
        let change = TableChange {
            changed: &before_value != after_value,
            before: before_value,
            after: after_value.clone(),
        };
        diff.insert(table.clone(), serde_json::to_value(change)?);
    }
    Ok(Value::Object(diff))
}

/// Decode a per-table diff, keeping only the tables that changed
pub fn changed_tables(diff: &Value) -> Result<Vec<(String, TableChange)>, ProbeError> {
    let mut changed = Vec::new();
    for (table, entry) in as_object(diff, "diff")? {
        let change: TableChange = serde_json::from_value(entry.clone())?;
        if change.changed {
            changed.push((table.clone(), change));
        }
    }
    Ok(changed)
}

/// Header plus lines, or the "nothing changed" sentinel when there are no lines
pub fn report(header: &str, lines: Vec<String>, unchanged: &str) -> String {
    if lines.is_empty() {
        return unchanged.to_string();
    }
    let mut output = Vec::with_capacity(lines.len() + 1);
    output.push(header.to_string());
    output.extend(lines);
    output.join("\n")
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ProbeError> {
    value
        .as_object()
        .ok_or_else(|| ProbeError::Payload(format!("{} is not a table map", what)))
}

/// Factories for every bundled probe, by catalog name
pub fn catalog() -> Vec<(&'static str, ProbeFactory)> {
    vec![
        (row_count::NAME, bundled(RowCountProbe::new)),
        (checksum::NAME, bundled(ChecksumProbe::new)),
        (structure::NAME, bundled(StructureProbe::new)),
    ]
}

fn bundled<P, F>(build: F) -> ProbeFactory
where
    P: Probe + 'static,
    F: Fn(EventLog) -> P + Send + Sync + 'static,
{
    Arc::new(move |host: &Hawkeye| -> Result<Box<dyn Probe>, ProbeError> {
        Ok(Box::new(build(host.log_handle())))
    })
}

/// Factory for one bundled probe
pub fn factory(name: &str) -> Option<ProbeFactory> {
    catalog()
        .into_iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, factory)| factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_tables_marks_changes() {
        let diff = compare_tables(&json!({"users": 10, "orders": 3}), &json!({"users": 11, "orders": 3})).unwrap();

        assert_eq!(diff["users"], json!({"changed": true, "before": 10, "after": 11}));
        assert_eq!(diff["orders"]["changed"], json!(false));
    }

    #[test]
    fn test_compare_tables_new_table_has_null_before() {
        let diff = compare_tables(&json!({}), &json!({"audit": 1})).unwrap();
        assert_eq!(diff["audit"], json!({"changed": true, "before": null, "after": 1}));
    }

    #[test]
    fn test_compare_same_payload_has_no_changes() {
        let payload = json!({"a": "x", "b": {"nested": [1, 2]}});
        let diff = compare_tables(&payload, &payload).unwrap();
        assert!(changed_tables(&diff).unwrap().is_empty());
    }

    #[test]
    fn test_compare_rejects_non_objects() {
        assert!(matches!(compare_tables(&json!(1), &json!({})), Err(ProbeError::Payload(_))));
    }

    #[test]
    fn test_report_sentinel() {
        assert_eq!(report("Header", vec![], "Nothing"), "Nothing");
        assert_eq!(report("Header", vec!["a".into(), "b".into()], "Nothing"), "Header\na\nb");
    }

    #[test]
    fn test_catalog_names() {
        let names: Vec<_> = catalog().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Count", "Checksum", "Structure"]);
        assert!(factory("Count").is_some());
        assert!(factory("Nope").is_none());
    }
}
