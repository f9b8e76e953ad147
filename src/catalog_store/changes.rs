//! Change subscriptions for the catalog store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// What a successful mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    Upserted { id: String, created: bool },
    Removed { id: String },
}

impl CatalogChange {
    pub fn id(&self) -> &str {
        match self {
            CatalogChange::Upserted { id, .. } | CatalogChange::Removed { id } => id,
        }
    }
}

pub type ChangeListener = Arc<dyn Fn(&CatalogChange) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, ChangeListener)>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(self: &Arc<Self>, listener: ChangeListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push((id, listener)),
            Err(_) => warn!("Listener registry poisoned, subscription {} inactive", id),
        }
        Subscription {
            id,
            registry: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    fn unsubscribe(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Calls every listener registered at the time of the call. The registry
    /// lock is released first, so listeners may read the store or unsubscribe.
    pub(crate) fn notify(&self, change: &CatalogChange) {
        let snapshot: Vec<ChangeListener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
            Err(_) => {
                warn!("Listener registry poisoned, dropping change {:?}", change);
                return;
            }
        };
        for listener in snapshot {
            listener(change);
        }
    }
}

/// Handle returned by `CatalogStore::subscribe`.
///
/// `unsubscribe` may be called any number of times. Dropping the handle
/// does not unsubscribe.
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
    active: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(registry) = self.registry.upgrade() {
                registry.unsubscribe(self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
