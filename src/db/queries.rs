//! SQL query constants and builders
//!
//! Contains all SQL issued by the engine and the bundled probes.

use super::{quote_ident, quote_literal, split_ident};

/// List all base tables in the current schema
pub const LIST_TABLES: &str = r#"
    SELECT table_name
    FROM information_schema.tables
    WHERE table_schema = current_schema()
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// Row count of a table, in column `total`
pub fn count_rows(table: &str) -> String {
    format!("SELECT COUNT(1) AS total FROM {}", quote_ident(table))
}

/// One md5 hash per row, in column `row_hash`, ordered so the sequence is stable
pub fn row_hashes(table: &str) -> String {
    format!(
        "SELECT md5(t::text) AS row_hash FROM {} t ORDER BY 1",
        quote_ident(table)
    )
}

/// Column definitions of a table
pub fn describe_columns(table: &str) -> String {
    let (schema, name) = split_qualified(table);
    format!(
        r#"
    SELECT
        c.column_name,
        c.data_type,
        c.is_nullable,
        c.column_default
    FROM information_schema.columns c
    WHERE c.table_schema = {}
      AND c.table_name = {}
    ORDER BY c.ordinal_position
"#,
        schema, name
    )
}

/// Index definitions of a table
pub fn describe_indexes(table: &str) -> String {
    let (schema, name) = split_qualified(table);
    format!(
        r#"
    SELECT
        i.indexname,
        i.indexdef
    FROM pg_indexes i
    WHERE i.schemaname = {}
      AND i.tablename = {}
    ORDER BY i.indexname
"#,
        schema, name
    )
}

/// Schema expression and quoted table literal for catalog lookups
fn split_qualified(table: &str) -> (String, String) {
    let mut parts = split_ident(table);
    let name = quote_literal(&parts.pop().unwrap_or_default());
    match parts.pop() {
        Some(schema) => (quote_literal(&schema), name),
        None => ("current_schema()".to_string(), name),
    }
}
