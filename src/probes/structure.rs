//! Table structure probe
//!
//! Describes the columns and indexes of every configured table. Only
//! definitions are kept; planner statistics would show up as spurious changes.

use crate::config::ProbeConfig;
use crate::db::{queries, Database, Row};
use crate::error::ProbeError;
use crate::logger::{EventLog, LogLevel, ProbeLog};
use crate::probe::Probe;
use crate::probes::{changed_tables, compare_tables, report};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NAME: &str = "Structure";

const HEADER: &str = "Structure changes detected in the following tables";
const UNCHANGED: &str = "No Structure changes detected";

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnShape {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnShape {
    fn from_row(row: &Row) -> Result<Self, ProbeError> {
        Ok(Self {
            name: required(row, "column_name")?,
            data_type: required(row, "data_type")?,
            nullable: row.get_text("is_nullable").as_deref() == Some("YES"),
            default_value: row.get_text("column_default"),
        })
    }

    fn describe(&self) -> String {
        let mut def = self.data_type.clone();
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        def
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexShape {
    pub name: String,
    pub definition: String,
}

/// Structure of one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableShape {
    pub columns: Vec<ColumnShape>,
    pub indexes: Vec<IndexShape>,
}

impl TableShape {
    fn from_value(value: &Value) -> Result<Self, ProbeError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    fn column(&self, name: &str) -> Option<&ColumnShape> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn index(&self, name: &str) -> Option<&IndexShape> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Captures column and index definitions of every configured table
pub struct StructureProbe {
    log: ProbeLog,
}

impl StructureProbe {
    pub fn new(log: EventLog) -> Self {
        Self {
            log: log.for_probe(NAME),
        }
    }

    async fn describe(&self, db: &dyn Database, table: &str) -> Result<TableShape, ProbeError> {
        let columns = db
            .query(&queries::describe_columns(table))
            .await?
            .iter()
            .map(ColumnShape::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let indexes = db
            .query(&queries::describe_indexes(table))
            .await?
            .iter()
            .map(|row| {
                Ok(IndexShape {
                    name: required(row, "indexname")?,
                    definition: required(row, "indexdef")?,
                })
            })
            .collect::<Result<Vec<_>, ProbeError>>()?;

        if columns.is_empty() {
            self.log.log(
                format!("No columns found for table [{}]", table),
                Some(LogLevel::Warning),
            );
        }

        Ok(TableShape { columns, indexes })
    }
}

#[async_trait]
impl Probe for StructureProbe {
    fn name(&self) -> String {
        NAME.to_string()
    }

    async fn capture(&self, db: &dyn Database, config: &ProbeConfig) -> Result<Value, ProbeError> {
        let mut shapes = Map::new();
        for table in &config.tables {
            let shape = self.describe(db, table).await?;
            shapes.insert(table.clone(), serde_json::to_value(shape)?);
        }
        Ok(Value::Object(shapes))
    }

    fn compare(&self, before: &Value, after: &Value) -> Result<Value, ProbeError> {
        compare_tables(before, after)
    }

    fn render(&self, diff: &Value) -> Result<String, ProbeError> {
        let mut lines = Vec::new();
        for (table, change) in changed_tables(diff)? {
            let before = TableShape::from_value(&change.before)?;
            let after = TableShape::from_value(&change.after)?;
            lines.push(table);
            lines.extend(shape_changes(&before, &after));
        }
        Ok(report(HEADER, lines, UNCHANGED))
    }
}

/// Indented detail lines for one changed table
fn shape_changes(before: &TableShape, after: &TableShape) -> Vec<String> {
    let mut lines = Vec::new();

    for column in &after.columns {
        match before.column(&column.name) {
            None => lines.push(format!("  + column {} {}", column.name, column.describe())),
            Some(old) if old != column => lines.push(format!(
                "  ~ column {}: {} -> {}",
                column.name,
                old.describe(),
                column.describe()
            )),
            Some(_) => {}
        }
    }
    for column in &before.columns {
        if after.column(&column.name).is_none() {
            lines.push(format!("  - column {}", column.name));
        }
    }

    for index in &after.indexes {
        match before.index(&index.name) {
            None => lines.push(format!("  + index {}", index.name)),
            Some(old) if old != index => lines.push(format!("  ~ index {}", index.name)),
            Some(_) => {}
        }
    }
    for index in &before.indexes {
        if after.index(&index.name).is_none() {
            lines.push(format!("  - index {}", index.name));
        }
    }

    lines
}

fn required(row: &Row, column: &str) -> Result<String, ProbeError> {
    row.get_text(column)
        .ok_or_else(|| ProbeError::Payload(format!("missing column {} in catalog row", column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::FakeDatabase;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn probe() -> StructureProbe {
        StructureProbe::new(EventLog::with_writer(LogLevel::Error, Box::new(std::io::sink())))
    }

    fn column_row(name: &str, data_type: &str, nullable: &str) -> Row {
        Row::new([
            ("column_name", json!(name)),
            ("data_type", json!(data_type)),
            ("is_nullable", json!(nullable)),
            ("column_default", Value::Null),
        ])
    }

    #[tokio::test]
    async fn test_capture_describes_columns_and_indexes() {
        let db = FakeDatabase::with_tables(&[]);
        db.respond(
            queries::describe_columns("users"),
            vec![column_row("id", "integer", "NO"), column_row("email", "text", "YES")],
        );
        db.respond(
            queries::describe_indexes("users"),
            vec![Row::new([
                ("indexname", json!("users_pkey")),
                ("indexdef", json!("CREATE UNIQUE INDEX users_pkey ON users (id)")),
            ])],
        );

        let payload = probe().capture(&db, &ProbeConfig::with_tables(["users"])).await.unwrap();
        let shape: TableShape = serde_json::from_value(payload["users"].clone()).unwrap();

        assert_eq!(shape.columns.len(), 2);
        assert!(!shape.columns[0].nullable);
        assert_eq!(shape.indexes[0].name, "users_pkey");
    }

    #[test]
    fn test_render_lists_column_and_index_changes() {
        let probe = probe();
        let before = TableShape {
            columns: vec![
                ColumnShape { name: "id".into(), data_type: "integer".into(), nullable: false, default_value: None },
                ColumnShape { name: "legacy".into(), data_type: "text".into(), nullable: true, default_value: None },
            ],
            indexes: vec![],
        };
        let after = TableShape {
            columns: vec![
                ColumnShape { name: "id".into(), data_type: "bigint".into(), nullable: false, default_value: None },
                ColumnShape { name: "email".into(), data_type: "text".into(), nullable: true, default_value: None },
            ],
            indexes: vec![IndexShape { name: "users_email_idx".into(), definition: "CREATE INDEX".into() }],
        };

        let diff = probe
            .compare(&json!({"users": before}), &json!({"users": after}))
            .unwrap();

        assert_eq!(
            probe.render(&diff).unwrap(),
            [
                "Structure changes detected in the following tables",
                "users",
                "  ~ column id: integer NOT NULL -> bigint NOT NULL",
                "  + column email text",
                "  - column legacy",
                "  + index users_email_idx",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_render_no_changes() {
        let probe = probe();
        let shape = json!({"users": TableShape::default()});
        let diff = probe.compare(&shape, &shape).unwrap();
        assert_eq!(probe.render(&diff).unwrap(), "No Structure changes detected");
    }
}
