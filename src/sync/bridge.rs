//! Keeps each mounted view's private copy of the catalog in step with the
//! store.
//!
//! A view refreshes when the storage reports a write to the catalog key, when
//! the store it reads through is mutated in-process, when the host asks for
//! it, or when the poll interval elapses with nothing else happening. All of
//! those only raise a single pending flag, so a burst of triggers costs one
//! storage read.

use crate::catalog_store::{
    CatalogChange, CatalogEntry, CatalogError, CatalogStore, Subscription, CATALOG_STORAGE_KEY,
};
use crate::search::{query, CatalogQuery};
use crate::storage::{Storage, StorageChange};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on how stale a view can get when no notification arrives.
    pub poll_interval: Duration,
    /// Storage key whose change notifications trigger a refresh.
    pub catalog_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            catalog_key: CATALOG_STORAGE_KEY.to_string(),
        }
    }
}

/// What a view currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    /// Successful storage reads since mount, the initial one excluded.
    pub refreshes: u64,
    /// The view's working copy of the whole catalog.
    pub catalog: Vec<CatalogEntry>,
    pub query: CatalogQuery,
    /// `catalog` after `query`.
    pub results: Vec<CatalogEntry>,
}

/// State shared by a mounted view, its refresh task and its store listener.
struct ViewState {
    /// Holds the current snapshot. Every update goes through the channel's
    /// own lock, so a requery never interleaves with a catalog swap.
    publisher: watch::Sender<ViewSnapshot>,
    pending: Notify,
}

impl ViewState {
    /// Swaps in a freshly read catalog. Watchers are only woken when the
    /// catalog actually changed.
    fn replace_catalog(&self, catalog: Vec<CatalogEntry>) {
        self.publisher.send_if_modified(|view| {
            view.refreshes += 1;
            if view.catalog == catalog {
                return false;
            }
            view.results = query(&catalog, &view.query);
            view.catalog = catalog;
            true
        });
    }

    fn replace_query(&self, criteria: CatalogQuery) {
        self.publisher.send_modify(|view| {
            view.results = query(&view.catalog, &criteria);
            view.query = criteria;
        });
    }
}

/// Mounts views over one store and the storage behind it.
#[derive(Clone)]
pub struct SyncBridge {
    store: Arc<dyn CatalogStore>,
    storage: Arc<dyn Storage>,
    config: SyncConfig,
}

impl SyncBridge {
    pub fn new(store: Arc<dyn CatalogStore>, storage: Arc<dyn Storage>, config: SyncConfig) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Takes the initial snapshot, runs `criteria` over it and starts the
    /// view's refresh task. Must be called from within a tokio runtime.
    pub fn mount(&self, criteria: CatalogQuery) -> Result<MountedView, CatalogError> {
        let changes = self.storage.watch();
        let catalog = self.store.list()?;
        let results = query(&catalog, &criteria);
        let (publisher, _) = watch::channel(ViewSnapshot {
            refreshes: 0,
            catalog,
            query: criteria,
            results,
        });
        let state = Arc::new(ViewState {
            publisher,
            pending: Notify::new(),
        });

        let listener_state = state.clone();
        let subscription = self.store.subscribe(Arc::new(move |change: &CatalogChange| {
            debug!("Catalog change for '{}', scheduling view refresh", change.id());
            listener_state.pending.notify_one();
        }));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            ViewTask {
                store: self.store.clone(),
                state: state.clone(),
                changes: Some(changes),
                catalog_key: self.config.catalog_key.clone(),
                poll_interval: self.config.poll_interval,
                cancel: cancel.clone(),
            }
            .run(),
        );

        info!(
            "Mounted catalog view (poll every {:?})",
            self.config.poll_interval
        );
        Ok(MountedView {
            state,
            subscription,
            cancel,
            task: Some(task),
        })
    }
}

struct ViewTask {
    store: Arc<dyn CatalogStore>,
    state: Arc<ViewState>,
    changes: Option<broadcast::Receiver<StorageChange>>,
    catalog_key: String,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl ViewTask {
    async fn run(self) {
        let ViewTask {
            store,
            state,
            mut changes,
            catalog_key,
            poll_interval,
            cancel,
        } = self;

        let mut poll = time::interval_at(Instant::now() + poll_interval, poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = state.pending.notified() => {}
                _ = poll.tick() => {}
                is_trigger = next_change(&mut changes, &catalog_key) => {
                    if is_trigger {
                        state.pending.notify_one();
                    }
                    continue;
                }
            }

            drain_changes(&mut changes);
            match store.list() {
                Ok(catalog) => state.replace_catalog(catalog),
                Err(e) => warn!("Catalog refresh failed, keeping previous copy: {}", e),
            }
            poll.reset();
        }

        debug!("Catalog view task stopped");
    }
}

/// Waits for the next storage notification and tells whether it should
/// trigger a refresh. Resolves never once the feed is gone.
async fn next_change(
    changes: &mut Option<broadcast::Receiver<StorageChange>>,
    catalog_key: &str,
) -> bool {
    let Some(receiver) = changes.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(change) => change.key == catalog_key,
        Err(RecvError::Lagged(skipped)) => {
            warn!(
                "Storage change feed lagged by {} messages, refreshing",
                skipped
            );
            true
        }
        Err(RecvError::Closed) => {
            info!("Storage change feed closed, falling back to polling");
            *changes = None;
            false
        }
    }
}

/// Discards notifications already queued: the read about to happen covers
/// the writes they announce. An in-process write both notifies the store
/// subscription and lands on the feed, and must cost one read.
fn drain_changes(changes: &mut Option<broadcast::Receiver<StorageChange>>) {
    let Some(receiver) = changes.as_mut() else {
        return;
    };
    loop {
        match receiver.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Closed) => {
                info!("Storage change feed closed, falling back to polling");
                *changes = None;
                break;
            }
        }
    }
}

/// One live view. Dropping it tears it down as well; `unmount` additionally
/// waits for the refresh task to finish.
pub struct MountedView {
    state: Arc<ViewState>,
    subscription: Subscription,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MountedView {
    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.publisher.borrow().clone()
    }

    pub fn results(&self) -> Vec<CatalogEntry> {
        self.state.publisher.borrow().results.clone()
    }

    /// Receiver woken whenever the results may have changed.
    pub fn watch(&self) -> watch::Receiver<ViewSnapshot> {
        self.state.publisher.subscribe()
    }

    /// Re-runs the query engine over the current working copy with new
    /// criteria. Does not read storage.
    pub fn set_query(&self, criteria: CatalogQuery) {
        self.state.replace_query(criteria);
    }

    /// Schedules a refresh. Coalesces with any refresh already pending.
    pub fn request_refresh(&self) {
        self.state.pending.notify_one();
    }

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Detaches the view from the store and the storage feed, stops polling
    /// and waits for the refresh task to exit.
    pub async fn unmount(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Catalog view task ended abnormally: {}", e);
            }
        }
        info!("Unmounted catalog view");
    }

    fn teardown(&self) {
        self.cancel.cancel();
        self.subscription.unsubscribe();
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.teardown();
    }
}
