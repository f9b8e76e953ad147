mod changes;
mod error;
mod models;
mod store;
mod trait_def;
mod validation;

pub use changes::{CatalogChange, ChangeListener, Subscription};
pub use error::CatalogError;
pub use models::*;
pub use store::{StorageCatalogStore, CATALOG_STORAGE_KEY};
pub use trait_def::CatalogStore;
pub use validation::{
    new_entry_id, normalize, parse_int_prefix, split_list, validate_entry, EntryDraft,
    ValidationError, ValidationErrors, ValidationReason, ValidationResult,
};
