use crate::catalog_store::FileAsset;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

pub const UPLOAD_URL_PREFIX: &str = "blob:session/";

/// Handles for files picked during one admin session.
///
/// A handle stored in an entry outlives the session that issued it; once
/// revoked it no longer resolves to anything.
#[derive(Default)]
pub struct SessionUploads {
    live: Mutex<HashMap<String, FileAsset>>,
}

impl SessionUploads {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<String, FileAsset>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an uploaded file and returns its asset with a fresh handle.
    pub fn register(&self, name: &str, mime_type: &str, size: u64) -> FileAsset {
        let asset = FileAsset {
            name: name.to_string(),
            url: format!("{}{}", UPLOAD_URL_PREFIX, Uuid::new_v4()),
            size,
            mime_type: mime_type.to_string(),
        };
        debug!("Registered upload '{}' as {}", name, asset.url);
        self.live().insert(asset.url.clone(), asset.clone());
        asset
    }

    pub fn resolve(&self, url: &str) -> Option<FileAsset> {
        self.live().get(url).cloned()
    }

    pub fn revoke(&self, url: &str) -> bool {
        self.live().remove(url).is_some()
    }

    /// Drops every handle, returning how many were live.
    pub fn revoke_all(&self) -> usize {
        let mut live = self.live();
        let count = live.len();
        live.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }
}
