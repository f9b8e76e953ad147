//! In-process storage backend.
//!
//! Clones share the same entries and change feed, so several views mounted
//! over clones of one `MemoryStorage` behave like browser tabs sharing one
//! origin's storage.

use super::{check_quota, ChangeFeed, Storage, StorageChange, StorageError, UpdateFn};
use super::DEFAULT_MAX_PAYLOAD_BYTES;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    changes: ChangeFeed,
    max_payload_bytes: usize,
    offline: Arc<AtomicBool>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_max_payload_bytes(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    pub fn with_max_payload_bytes(max_payload_bytes: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            changes: ChangeFeed::new(),
            max_payload_bytes,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the medium becoming unavailable. While offline every
    /// operation fails with `StorageError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Write a raw value without publishing a change, as another process
    /// writing to shared storage would from this process' point of view.
    pub fn write_unobserved(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_online()?;
        self.entries
            .write()
            .map_err(|_| StorageError::Unavailable("entries lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage is offline".to_string()));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_online()?;
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("entries lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_online()?;
        check_quota(key, value, self.max_payload_bytes)?;
        self.entries
            .write()
            .map_err(|_| StorageError::Unavailable("entries lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        self.changes.publish(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_online()?;
        let removed = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("entries lock poisoned".to_string()))?
            .remove(key);
        if removed.is_some() {
            self.changes.publish(key);
        }
        Ok(())
    }

    fn update(&self, key: &str, update: UpdateFn<'_>) -> Result<bool, StorageError> {
        self.ensure_online()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("entries lock poisoned".to_string()))?;
        let Some(value) = update(entries.get(key).cloned())? else {
            return Ok(false);
        };
        check_quota(key, &value, self.max_payload_bytes)?;
        entries.insert(key.to_string(), value);
        drop(entries);
        self.changes.publish(key);
        Ok(true)
    }

    fn watch(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
