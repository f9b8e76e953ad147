//! CatalogStore trait definition.

use super::changes::{ChangeListener, Subscription};
use super::error::CatalogError;
use super::models::CatalogEntry;

/// The single authority over catalog entries.
///
/// Callers always receive owned copies; nothing outside the store can
/// mutate what it holds.
pub trait CatalogStore: Send + Sync {
    /// Snapshot of every entry, in storage order.
    fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Copy of the entry with `id`, if present.
    fn get(&self, id: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Insert `entry`, or replace the entry with the same id. A replaced
    /// entry keeps its original upload date. Returns the stored entry.
    fn upsert(&self, entry: CatalogEntry) -> Result<CatalogEntry, CatalogError>;

    /// Delete the entry with `id`. Returns whether anything was deleted;
    /// an unknown id is not an error.
    fn remove(&self, id: &str) -> Result<bool, CatalogError>;

    /// Register a listener called after every successful mutation, once the
    /// new state has been persisted.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}
