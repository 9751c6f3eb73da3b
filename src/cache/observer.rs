//! Lifecycle hooks invoked by the cache engine.

use tracing::{debug, info};

use super::CacheEntry;

/// Receives engine lifecycle events. Every hook defaults to a no-op.
pub trait CacheObserver: Send + Sync {
    /// A valid entry was read and its TTL refreshed.
    fn on_hit(&self, _entry: &CacheEntry) {}

    /// A new row was created, by a put or by a miss on get.
    fn on_created(&self, _entry: &CacheEntry, _from_miss: bool) {}

    /// A stale entry got a new value.
    fn on_regenerated(&self, _entry: &CacheEntry) {}

    /// A capacity eviction pass selected `victims` and deleted `removed` of them.
    ///
    /// `removed` can be lower than `victims.len()` when an overlapping pass
    /// deleted some of them first.
    fn on_evicted(&self, _victims: &[CacheEntry], _removed: usize) {}

    /// Entries were removed by explicit deletion.
    fn on_deleted(&self, _removed: usize) {}
}

/// Logs every lifecycle event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_hit(&self, entry: &CacheEntry) {
        debug!("Cache hit for key {}", entry.key);
    }

    fn on_created(&self, entry: &CacheEntry, from_miss: bool) {
        if from_miss {
            info!("Cache miss for key {}, generated new value", entry.key);
        } else {
            info!("Created cache entry for key {}", entry.key);
        }
    }

    fn on_regenerated(&self, entry: &CacheEntry) {
        info!("Regenerated stale cache entry for key {}", entry.key);
    }

    fn on_evicted(&self, victims: &[CacheEntry], removed: usize) {
        let keys: Vec<&str> = victims.iter().map(|e| e.key.as_str()).collect();
        info!("Evicted {} cache entries over capacity: {:?}", removed, keys);
    }

    fn on_deleted(&self, removed: usize) {
        debug!("Deleted {} cache entries", removed);
    }
}
