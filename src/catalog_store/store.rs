//! Catalog store persisted as one JSON array under a storage key.
//!
//! The store holds no copy of the entries: every read goes to storage, so
//! store handles over the same storage always agree. Mutations are
//! read-modify-write cycles run through `Storage::update`, so they are
//! serialized against every handle writing the same storage.

use super::changes::{CatalogChange, ChangeListener, SubscriberRegistry, Subscription};
use super::error::CatalogError;
use super::models::CatalogEntry;
use super::trait_def::CatalogStore;
use super::validation::validate_entry;
use crate::storage::{Storage, StorageError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CATALOG_STORAGE_KEY: &str = "accMusicItems";

pub struct StorageCatalogStore {
    storage: Arc<dyn Storage>,
    key: String,
    subscribers: Arc<SubscriberRegistry>,
}

/// Decodes a persisted payload. A payload that is not a JSON array is
/// corrupt; individual records that do not decode or break an invariant
/// are skipped.
fn decode_payload(key: &str, raw: &str) -> Result<Vec<CatalogEntry>, StorageError> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

    let mut seen_ids = HashSet::new();
    let mut entries = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let entry: CatalogEntry = match serde_json::from_value(record) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping undecodable catalog record #{}: {}", index, e);
                continue;
            }
        };
        if let Err(e) = validate_entry(&entry) {
            warn!("Skipping invalid catalog record '{}': {}", entry.id, e);
            continue;
        }
        if !seen_ids.insert(entry.id.clone()) {
            warn!("Skipping duplicate catalog record '{}'", entry.id);
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}

impl StorageCatalogStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, CATALOG_STORAGE_KEY)
    }

    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            subscribers: Arc::new(SubscriberRegistry::default()),
        }
    }

    /// The storage key holding the catalog payload.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn load(&self) -> Result<Vec<CatalogEntry>, StorageError> {
        let raw = self.storage.get(&self.key)?;
        Ok(self.decode_or_empty(raw.as_deref()))
    }

    fn decode_or_empty(&self, raw: Option<&str>) -> Vec<CatalogEntry> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        decode_payload(&self.key, raw).unwrap_or_else(|e| {
            warn!("Treating catalog as empty: {}", e);
            Vec::new()
        })
    }

    /// Runs a read-modify-write cycle on the stored catalog and persists the
    /// result when `mutate` reports a change.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<CatalogEntry>) -> Option<T>,
    ) -> Result<Option<T>, CatalogError> {
        let mut outcome = None;
        self.storage.update(
            &self.key,
            Box::new(|raw: Option<String>| {
                let mut entries = self.decode_or_empty(raw.as_deref());
                outcome = mutate(&mut entries);
                if outcome.is_none() {
                    return Ok(None);
                }
                Ok(Some(serde_json::to_string(&entries)?))
            }),
        )?;
        Ok(outcome)
    }
}

impl CatalogStore for StorageCatalogStore {
    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.load()?)
    }

    fn get(&self, id: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.load()?.into_iter().find(|entry| entry.id == id))
    }

    fn upsert(&self, mut entry: CatalogEntry) -> Result<CatalogEntry, CatalogError> {
        validate_entry(&entry)?;

        let created = self
            .mutate(|entries| {
                match entries.iter_mut().find(|existing| existing.id == entry.id) {
                    Some(existing) => {
                        entry.upload_date = existing.upload_date;
                        *existing = entry.clone();
                        Some(false)
                    }
                    None => {
                        entries.push(entry.clone());
                        Some(true)
                    }
                }
            })?
            .unwrap_or(false);

        info!(
            "{} catalog entry '{}' ({})",
            if created { "Created" } else { "Updated" },
            entry.id,
            entry.title
        );
        self.subscribers.notify(&CatalogChange::Upserted {
            id: entry.id.clone(),
            created,
        });
        Ok(entry)
    }

    fn remove(&self, id: &str) -> Result<bool, CatalogError> {
        let removed = self.mutate(|entries| {
            let position = entries.iter().position(|entry| entry.id == id)?;
            Some(entries.remove(position))
        })?;

        match removed {
            Some(entry) => {
                info!("Removed catalog entry '{}' ({})", entry.id, entry.title);
                self.subscribers.notify(&CatalogChange::Removed { id: entry.id });
                Ok(true)
            }
            None => {
                debug!("Remove of unknown catalog entry '{}' ignored", id);
                Ok(false)
            }
        }
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.subscribers.subscribe(listener)
    }
}
