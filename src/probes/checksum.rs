//! Data checksum probe
//!
//! Hashes the ordered per-row md5 digests of a table with SHA-256, so any
//! insert, update or delete changes the table's checksum.

use crate::config::ProbeConfig;
use crate::db::{queries, Database};
use crate::error::ProbeError;
use crate::logger::{EventLog, LogLevel, ProbeLog};
use crate::probe::Probe;
use crate::probes::{changed_tables, compare_tables, report};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const NAME: &str = "Checksum";

/// Stored in place of a checksum the database did not return
pub const CHECKSUM_UNAVAILABLE: &str = "error-fetching-checksum";

const HEADER: &str = "Data-Changes detected in the following tables";
const UNCHANGED: &str = "No data changes detected";

/// Captures a content checksum of every configured table
pub struct ChecksumProbe {
    log: ProbeLog,
}

impl ChecksumProbe {
    pub fn new(log: EventLog) -> Self {
        Self {
            log: log.for_probe(NAME),
        }
    }

    async fn checksum(&self, db: &dyn Database, table: &str) -> Result<String, ProbeError> {
        let rows = db.query(&queries::row_hashes(table)).await?;

        let mut hasher = Sha256::new();
        for row in &rows {
            match row.get_text("row_hash") {
                Some(hash) => hasher.update(hash.as_bytes()),
                None => {
                    self.log.log(
                        format!("Could not get Checksum for table [{}]", table),
                        Some(LogLevel::Notice),
                    );
                    return Ok(CHECKSUM_UNAVAILABLE.to_string());
                }
            }
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[async_trait]
impl Probe for ChecksumProbe {
    fn name(&self) -> String {
        NAME.to_string()
    }

    async fn capture(&self, db: &dyn Database, config: &ProbeConfig) -> Result<Value, ProbeError> {
        let mut checksums = Map::new();
        for table in &config.tables {
            let checksum = self.checksum(db, table).await?;
            checksums.insert(table.clone(), Value::String(checksum));
        }
        Ok(Value::Object(checksums))
    }

    fn compare(&self, before: &Value, after: &Value) -> Result<Value, ProbeError> {
        compare_tables(before, after)
    }

    fn render(&self, diff: &Value) -> Result<String, ProbeError> {
        let lines = changed_tables(diff)?
            .into_iter()
            .map(|(table, _)| table)
            .collect();
        Ok(report(HEADER, lines, UNCHANGED))
    }
}
