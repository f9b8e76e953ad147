//! Shared-code gate in front of the admin console.
//!
//! This only decides which view a host renders. It is not an access control
//! mechanism: the code is shared and the flag lives in plain storage.

use super::console::AdminConsole;
use crate::catalog_store::CatalogStore;
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const SESSION_STORAGE_KEY: &str = "accAdminAuth";
pub const DEFAULT_ACCESS_CODE: &str = "ACC1234";

const SESSION_FLAG: &str = "true";

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid access code")]
    InvalidAccessCode,

    #[error("Admin session required")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct AdminGate {
    storage: Arc<dyn Storage>,
    session_key: String,
    access_code: String,
}

impl AdminGate {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_settings(storage, SESSION_STORAGE_KEY, DEFAULT_ACCESS_CODE)
    }

    pub fn with_settings(
        storage: Arc<dyn Storage>,
        session_key: impl Into<String>,
        access_code: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            session_key: session_key.into(),
            access_code: access_code.into(),
        }
    }

    pub fn login(&self, code: &str) -> Result<(), AdminError> {
        if code.trim() != self.access_code {
            warn!("Admin login rejected");
            return Err(AdminError::InvalidAccessCode);
        }
        self.storage.set(&self.session_key, SESSION_FLAG)?;
        info!("Admin session started");
        Ok(())
    }

    pub fn is_authenticated(&self) -> Result<bool, AdminError> {
        Ok(self.storage.get(&self.session_key)?.as_deref() == Some(SESSION_FLAG))
    }

    pub fn logout(&self) -> Result<(), AdminError> {
        self.storage.remove(&self.session_key)?;
        info!("Admin session ended");
        Ok(())
    }

    /// Opens the console if a session is active.
    pub fn open_console(&self, store: Arc<dyn CatalogStore>) -> Result<AdminConsole, AdminError> {
        if !self.is_authenticated()? {
            return Err(AdminError::NotAuthenticated);
        }
        Ok(AdminConsole::new(store))
    }
}
