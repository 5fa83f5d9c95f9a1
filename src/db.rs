//! Database handle
//!
//! The engine never queries the database itself except to resolve the table
//! list; probes receive a [`Database`] and run their own queries through it.

pub mod queries;

use crate::config::DatabaseConfig;
use crate::error::DbError;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde_json::Value;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::{debug, info};

/// One result row: column name to value, in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column value rendered as text; NULL and missing columns yield `None`
    pub fn get_text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Query execution capability shared by the host and its probes
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute `sql` and return every row
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError>;

    /// Names of all tables visible in the current schema, ordered
    ///
    /// Names that would not survive [`split_ident`] as one identifier come
    /// back double-quoted.
    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let rows = self.query(queries::LIST_TABLES).await?;
        rows.iter()
            .map(|row| {
                row.get_text("table_name")
                    .map(|name| table_ref(&name))
                    .ok_or_else(|| DbError::Unexpected("table listing without table_name".to_string()))
            })
            .collect()
    }
}

/// [`Database`] backed by a deadpool-postgres pool
///
/// Statements go through the simple query protocol, so every value comes
/// back as text (or NULL).
#[derive(Clone)]
pub struct PgDatabase {
    pool: Pool,
}

impl PgDatabase {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check that a connection can be obtained and used
    pub async fn ping(&self) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        let client = self.pool.get().await?;
        let messages = client.simple_query(sql).await?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let columns = row
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let value = row
                            .get(i)
                            .map(|v| Value::String(v.to_string()))
                            .unwrap_or(Value::Null);
                        (column.name().to_string(), value)
                    })
                    .collect::<Vec<_>>();
                rows.push(Row { columns });
            }
        }

        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

/// Create a connection pool with the given configuration
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, DbError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    let pool = if config.use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)?
    };

    info!(
        "Connection pool created for {}@{}:{}/{} (TLS: {})",
        config.user, config.host, config.port, config.database, config.use_tls
    );
    Ok(pool)
}

/// Split a table reference into its identifier parts
///
/// Parts are separated by unquoted dots. A double-quoted part may contain
/// dots, and `""` inside it stands for one quote: `public."odd.name"` is
/// schema `public`, table `odd.name`.
pub fn split_ident(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => quoted = !quoted,
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Table reference for a single, unqualified table name
pub fn table_ref(name: &str) -> String {
    if name.contains(['.', '"']) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Quote a possibly schema-qualified table reference (`public.users`)
pub fn quote_ident(name: &str) -> String {
    split_ident(name)
        .iter()
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory database answering queries from canned rows
    #[derive(Default)]
    pub(crate) struct FakeDatabase {
        pub tables: Vec<String>,
        responses: Mutex<HashMap<String, Vec<Row>>>,
        pub executed: Mutex<Vec<String>>,
    }

    impl FakeDatabase {
        pub(crate) fn with_tables(tables: &[&str]) -> Self {
            Self {
                tables: tables.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn respond(&self, sql: impl Into<String>, rows: Vec<Row>) {
            self.responses.lock().insert(sql.into(), rows);
        }

        pub(crate) fn executed(&self) -> Vec<String> {
            self.executed.lock().clone()
        }
    }

    #[async_trait]
    impl Database for FakeDatabase {
        async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
            self.executed.lock().push(sql.to_string());
            if sql == queries::LIST_TABLES {
                return Ok(self
                    .tables
                    .iter()
                    .map(|t| Row::new([("table_name", Value::String(t.clone()))]))
                    .collect());
            }
            self.responses
                .lock()
                .get(sql)
                .cloned()
                .ok_or_else(|| DbError::Unexpected(format!("no canned response for {}", sql)))
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("public.users"), "\"public\".\"users\"");
        assert_eq!(quote_ident("\"we\"\"ird\""), "\"we\"\"ird\"");
        assert_eq!(quote_ident("\"odd.name\""), "\"odd.name\"");
        assert_eq!(quote_ident("public.\"odd.name\""), "\"public\".\"odd.name\"");
    }

    #[test]
    fn test_split_ident() {
        assert_eq!(split_ident("users"), vec!["users"]);
        assert_eq!(split_ident("audit.events"), vec!["audit", "events"]);
        assert_eq!(split_ident("\"odd.name\""), vec!["odd.name"]);
        assert_eq!(split_ident("\"a\"\"b\".c"), vec!["a\"b", "c"]);
    }

    #[test]
    fn test_table_ref_round_trips_through_split() {
        for name in ["users", "odd.name", "we\"ird", "a.b\".c"] {
            assert_eq!(split_ident(&table_ref(name)), vec![name.to_string()]);
        }
        assert_eq!(table_ref("users"), "users");
        assert_eq!(table_ref("odd.name"), "\"odd.name\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::new([("total", Value::String("11".into())), ("note", Value::Null)]);
        assert_eq!(row.get_text("total").as_deref(), Some("11"));
        assert_eq!(row.get_text("note"), None);
        assert_eq!(row.get_text("missing"), None);
    }

    #[tokio::test]
    async fn test_list_tables_uses_default_query() {
        let db = FakeDatabase::with_tables(&["a", "b"]);
        let tables = db.list_tables().await.unwrap();
        assert_eq!(tables, vec!["a", "b"]);
        assert_eq!(db.executed(), vec![queries::LIST_TABLES.to_string()]);
    }

    #[tokio::test]
    async fn test_list_tables_quotes_dotted_names() {
        let db = FakeDatabase::with_tables(&["odd.name", "plain"]);
        let tables = db.list_tables().await.unwrap();

        assert_eq!(tables, vec!["\"odd.name\"", "plain"]);
        assert_eq!(
            queries::count_rows(&tables[0]),
            "SELECT COUNT(1) AS total FROM \"odd.name\""
        );
    }
}
