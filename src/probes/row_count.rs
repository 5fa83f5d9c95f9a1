//! Row count probe

use crate::config::ProbeConfig;
use crate::db::{queries, Database};
use crate::error::ProbeError;
use crate::logger::{EventLog, LogLevel, ProbeLog};
use crate::probe::Probe;
use crate::probes::{changed_tables, compare_tables, report};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const NAME: &str = "Count";

const HEADER: &str = "Row Count changes detected in the following tables";
const UNCHANGED: &str = "No Row Count changes detected";

/// Captures `COUNT(1)` of every configured table
pub struct RowCountProbe {
    log: ProbeLog,
}

impl RowCountProbe {
    pub fn new(log: EventLog) -> Self {
        Self {
            log: log.for_probe(NAME),
        }
    }
}

#[async_trait]
impl Probe for RowCountProbe {
    fn name(&self) -> String {
        NAME.to_string()
    }

    async fn capture(&self, db: &dyn Database, config: &ProbeConfig) -> Result<Value, ProbeError> {
        let mut counts = Map::new();
        for table in &config.tables {
            let rows = db.query(&queries::count_rows(table)).await?;
            let total = rows
                .first()
                .and_then(|row| row.get("total"))
                .ok_or_else(|| ProbeError::Payload(format!("no row count returned for {}", table)))?;
            let total = parse_count(total)
                .ok_or_else(|| ProbeError::Payload(format!("row count of {} is not a number", table)))?;

            self.log.log(format!("{} has {} rows", table, total), Some(LogLevel::Debug));
            counts.insert(table.clone(), Value::from(total));
        }
        Ok(Value::Object(counts))
    }

    fn compare(&self, before: &Value, after: &Value) -> Result<Value, ProbeError> {
        compare_tables(before, after)
    }

    fn render(&self, diff: &Value) -> Result<String, ProbeError> {
        let lines = changed_tables(diff)?
            .into_iter()
            .map(|(table, change)| {
                let before = parse_count(&change.before).unwrap_or(0);
                let after = parse_count(&change.after).unwrap_or(0);
                let delta = after - before;
                let sign = if delta > 0 { "+" } else { "" };
                format!("{} {}{}", table, sign, delta)
            })
            .collect();
        Ok(report(HEADER, lines, UNCHANGED))
    }
}

fn parse_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
