//! Key/value storage port.
//!
//! The catalog and the admin session flag each live under one string key.
//! Backends publish a `StorageChange` for every successful write so that
//! other views sharing the backend can notice it without polling.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use thiserror::Error;
use tokio::sync::broadcast;

/// Largest value a backend accepts, mirroring browser storage quotas.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded writing '{key}': {size} bytes, limit is {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Corrupt payload under '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Notification that the value under `key` was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

/// Derives the new value under a key from its current one. Returning
/// `Ok(None)` leaves the value as it is.
pub type UpdateFn<'a> =
    Box<dyn FnOnce(Option<String>) -> Result<Option<String>, StorageError> + 'a>;

/// Minimal storage interface the catalog is built on.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value under `key`. Either the whole value is stored or,
    /// on error, the previous value is left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read-modify-write of one key. No other write to the backend lands
    /// between the read handed to `update` and the write of its result, from
    /// this handle, its clones, or other handles on the same medium.
    /// `update` must not call back into the storage. Returns whether a value
    /// was written.
    fn update(&self, key: &str, update: UpdateFn<'_>) -> Result<bool, StorageError>;

    /// Subscribe to change notifications for writes made through this backend.
    fn watch(&self) -> broadcast::Receiver<StorageChange>;
}

/// Fan-out of `StorageChange` notifications shared by the backends.
#[derive(Clone)]
pub(crate) struct ChangeFeed {
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub(crate) fn publish(&self, key: &str) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.sender.send(StorageChange {
            key: key.to_string(),
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }
}

pub(crate) fn check_quota(key: &str, value: &str, limit: usize) -> Result<(), StorageError> {
    if value.len() > limit {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            size: value.len(),
            limit,
        });
    }
    Ok(())
}
