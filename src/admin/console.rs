//! Admin CRUD over the catalog store.

use crate::catalog_store::{
    normalize, CatalogEntry, CatalogError, CatalogStore, EntryDraft, EntryFiles,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// The entry currently loaded into the form.
#[derive(Debug, Clone)]
struct EditTarget {
    id: String,
    upload_date: DateTime<Utc>,
    files: EntryFiles,
}

pub struct AdminConsole {
    store: Arc<dyn CatalogStore>,
    editing: Option<EditTarget>,
}

impl AdminConsole {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            editing: None,
        }
    }

    pub fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.store.list()
    }

    /// Id of the entry being edited, if any.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_ref().map(|target| target.id.as_str())
    }

    /// Loads an entry into the form and returns the pre-filled draft.
    pub fn begin_edit(&mut self, id: &str) -> Result<EntryDraft, CatalogError> {
        let entry = self.store.get(id)?.ok_or_else(|| CatalogError::NotFound {
            id: id.to_string(),
        })?;
        self.editing = Some(EditTarget {
            id: entry.id.clone(),
            upload_date: entry.upload_date,
            files: entry.files.clone().unwrap_or_default(),
        });
        Ok(EntryDraft::from_entry(&entry))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Validates `draft` and writes it. While editing, the entry keeps its
    /// id and upload date, and file slots left empty keep their previous
    /// asset. Otherwise a new entry is created. The edit ends only when the
    /// write succeeds.
    pub fn submit(&mut self, mut draft: EntryDraft) -> Result<CatalogEntry, CatalogError> {
        match &self.editing {
            Some(target) => {
                draft.id = Some(target.id.clone());
                draft.upload_date = Some(target.upload_date);
                draft.files = target.files.overlaid_with(&draft.files);
            }
            None => {
                draft.id = None;
                draft.upload_date = None;
            }
        }

        let entry = normalize(&draft, Utc::now())?;
        let stored = self.store.upsert(entry)?;
        self.editing = None;
        Ok(stored)
    }

    /// Removes `id` once `confirm` agrees. Returns whether anything was
    /// deleted; an unknown id or a declined confirmation deletes nothing.
    pub fn delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&CatalogEntry) -> bool,
    ) -> Result<bool, CatalogError> {
        let Some(entry) = self.store.get(id)? else {
            return Ok(false);
        };
        if !confirm(&entry) {
            info!("Delete of '{}' declined", id);
            return Ok(false);
        }
        let removed = self.store.remove(id)?;
        if removed && self.editing() == Some(id) {
            self.editing = None;
        }
        Ok(removed)
    }
}
