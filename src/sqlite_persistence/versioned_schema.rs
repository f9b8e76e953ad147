//! Declarative SQLite schemas with a version number.
//!
//! A `VersionedSchema` describes the tables of one schema version and the
//! migration that upgrades the previous version to it. The version is kept
//! in `PRAGMA user_version`, offset by `BASE_DB_VERSION` so that databases
//! never touched by this crate (user_version = 0) are recognizable.

use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            _ => None,
        }
    }
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'a str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns_sql = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, columns_sql),
            params![],
        )?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

fn strip_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

struct ActualColumn {
    name: String,
    sql_type: Option<&'static SqlType>,
    non_null: bool,
    default_value: Option<String>,
    is_primary_key: bool,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    /// Checks that the tables in `conn` match this schema column by column.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual_columns = stmt
                .query_map(params![], |row| {
                    Ok(ActualColumn {
                        name: row.get(1)?,
                        sql_type: SqlType::from_sql(&row.get::<_, String>(2)?),
                        non_null: row.get::<_, i32>(3)? == 1,
                        default_value: row.get(4)?,
                        is_primary_key: row.get::<_, i32>(5)? == 1,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if actual_columns.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {}",
                    table.name,
                    actual_columns.len(),
                    table.columns.len()
                );
            }

            for (actual, expected) in actual_columns.iter().zip(table.columns.iter()) {
                if actual.name != expected.name {
                    bail!(
                        "Table {} column name mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        actual.name
                    );
                }
                if actual.sql_type != Some(expected.sql_type) {
                    bail!(
                        "Table {} column {} type mismatch: expected {:?}, got {:?}",
                        table.name,
                        expected.name,
                        expected.sql_type,
                        actual.sql_type
                    );
                }
                if actual.non_null != expected.non_null {
                    bail!(
                        "Table {} column {} non-null mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        expected.non_null,
                        actual.non_null
                    );
                }
                if actual.is_primary_key != expected.is_primary_key {
                    bail!(
                        "Table {} column {} primary key mismatch",
                        table.name,
                        expected.name
                    );
                }
                // SQLite may report defaults wrapped in parentheses
                if actual.default_value.as_deref().map(strip_parentheses)
                    != expected.default_value.map(strip_parentheses)
                {
                    bail!(
                        "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                        table.name,
                        expected.name,
                        expected.default_value,
                        actual.default_value
                    );
                }
            }

            for (index_name, _column) in table.indices {
                let index_exists: bool = conn
                    .query_row(
                        "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                        params![index_name, table.name],
                        |_| Ok(true),
                    )
                    .unwrap_or(false);
                if !index_exists {
                    bail!("Table {} is missing index '{}'", table.name, index_name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTES_TABLE: Table = Table {
        name: "notes",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("body", &SqlType::Text, non_null = true),
            sqlite_column!(
                "created_at",
                &SqlType::Integer,
                default_value = Some(DEFAULT_TIMESTAMP)
            ),
        ],
        indices: &[("idx_notes_body", "body")],
    };

    const SCHEMA: VersionedSchema = VersionedSchema {
        version: 2,
        tables: &[NOTES_TABLE],
        migration: None,
    };

    #[test]
    fn test_create_then_validate() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMA.create(&conn).unwrap();
        SCHEMA.validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, (BASE_DB_VERSION + 2) as i64);
    }

    #[test]
    fn test_validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL, created_at INTEGER DEFAULT (cast(strftime('%s','now') as int)))",
            [],
        )
        .unwrap();

        let err = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_notes_body"));
    }

    #[test]
    fn test_validate_detects_column_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", [])
            .unwrap();

        let err = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("has 2 columns, expected 3"));
    }
}
