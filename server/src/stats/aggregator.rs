//! Stats aggregator owning a cache that is cleared by change notifications.
//!
//! The cache holds at most one aggregate and moves between two states:
//! `Empty` and `Populated`. A hit never touches the store. A miss loads the
//! collection, computes, and stores the result unless an invalidation
//! arrived while it was loading. Invalidations come from a [`ChangeSource`];
//! writers never call into the aggregator.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CacheState, StatsAggregate};
use crate::storage::{ItemStore, StoreResult};
use crate::watcher::ChangeSource;

pub struct StatsAggregator {
    store: ItemStore,
    cache: RwLock<Option<StatsAggregate>>,
    /// Bumped on every invalidation, under the cache write lock
    epoch: AtomicU64,
}

impl StatsAggregator {
    pub fn new(store: ItemStore) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    /// Cached aggregate, or a fresh one computed from the store
    pub async fn get_stats(&self) -> StoreResult<StatsAggregate> {
        let cached = *self.cache.read();
        if let Some(stats) = cached {
            return Ok(stats);
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let items = self.store.load().await?;
        let stats = StatsAggregate::compute(&items);

        let mut cache = self.cache.write();
        if self.epoch.load(Ordering::Acquire) == epoch {
            *cache = Some(stats);
            debug!("Stats cache populated ({} items)", stats.total);
        } else {
            debug!("Stats cache invalidated during recompute, not storing");
        }

        Ok(stats)
    }

    /// Drop the cached aggregate
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        *cache = None;
    }

    pub fn state(&self) -> CacheState {
        match *self.cache.read() {
            Some(stats) => CacheState::Populated(stats),
            None => CacheState::Empty,
        }
    }

    /// Clear the cache on every change from `source` until `shutdown` fires.
    ///
    /// The subscription is taken before returning, so changes that happen
    /// after this call are never missed.
    pub fn spawn_invalidation(
        self: Arc<Self>,
        source: &dyn ChangeSource,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let mut changes = source.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => {
                            info!(
                                "{} changed ({:?}), invalidating stats cache",
                                change.path.display(),
                                change.kind
                            );
                            self.invalidate();
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Missed {} change notifications, invalidating stats cache", missed);
                            self.invalidate();
                        }
                        Err(RecvError::Closed) => {
                            info!("Change source closed, stats invalidation stopping");
                            break;
                        }
                    },
                    _ = shutdown.recv() => {
                        info!("Stats invalidation shutting down");
                        break;
                    }
                }
            }
        })
    }
}
