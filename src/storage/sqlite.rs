//! SQLite-backed storage.
//!
//! Values live in a single `kv_entries` table. Each write is one upsert
//! statement, so a concurrent reader sees either the old or the new value.
//! `update` runs inside a `BEGIN IMMEDIATE` transaction, which also orders it
//! against writers on other connections to the same file.

use super::{check_quota, ChangeFeed, Storage, StorageChange, StorageError, UpdateFn};
use super::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

const KV_TABLE_V0: Table = Table {
    name: "kv_entries",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const KV_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[KV_TABLE_V0],
    migration: None,
}];

/// How long a writer waits for another connection's transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UPSERT_SQL: &str = "INSERT INTO kv_entries (key, value, updated_at) \
     VALUES (?1, ?2, cast(strftime('%s','now') as int)) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = KV_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &KV_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating storage db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has tables but no storage schema version (user_version = {})",
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in KV_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating storage db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
            }
            current_version = schema.version;
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema.validate(conn)
}

/// Durable `Storage` over a SQLite database file.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    changes: ChangeFeed,
    max_payload_bytes: usize,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!("Failed to open storage database {:?}", db_path.as_ref())
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrate_if_needed(&mut conn)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate_if_needed(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: ChangeFeed::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(key, value, self.max_payload_bytes)?;
        self.with_conn(|conn| conn.execute(UPSERT_SQL, params![key, value]))?;
        self.changes.publish(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed =
            self.with_conn(|conn| conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key]))?;
        if removed > 0 {
            self.changes.publish(key);
        }
        Ok(())
    }

    fn update(&self, key: &str, update: UpdateFn<'_>) -> Result<bool, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
        // IMMEDIATE takes the database write lock before the read, so an update
        // on another connection cannot read the same value in between.
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = (|| -> Result<bool, StorageError> {
            let current: Option<String> = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(value) = update(current)? else {
                conn.execute("COMMIT", [])?;
                return Ok(false);
            };
            check_quota(key, &value, self.max_payload_bytes)?;
            conn.execute(UPSERT_SQL, params![key, value])?;
            conn.execute("COMMIT", [])?;
            Ok(true)
        })();

        match result {
            Ok(written) => {
                drop(conn);
                if written {
                    self.changes.publish(key);
                }
                Ok(written)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn watch(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
