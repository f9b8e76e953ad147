use super::validation::ValidationErrors;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog entry not found: {id}")]
    NotFound { id: String },
}
