//! Arrangement Catalog Library
//!
//! Catalog storage, validation, querying and view synchronization for a
//! music-arrangement storefront. The `catalog-cli` binary is one host of
//! these modules; tests and other hosts use them directly.

pub mod admin;
pub mod catalog_store;
pub mod config;
pub mod search;
pub mod sqlite_persistence;
pub mod storage;
pub mod suggest;
pub mod sync;

// Re-export commonly used types for convenience
pub use catalog_store::{
    normalize, CatalogEntry, CatalogError, CatalogStore, Category, Difficulty, EntryDraft,
    StorageCatalogStore,
};
pub use search::{query, CatalogQuery, SortKey};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError};
pub use sync::{MountedView, SyncBridge, SyncConfig};
