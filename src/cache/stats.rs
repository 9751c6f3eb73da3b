//! Cache Statistics Module
//!
//! Counts hits, misses, regenerations and evictions as the engine reports them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{CacheEntry, CacheObserver};

// == Cache Stats ==
/// Lock-free counters fed by the engine's observer hooks.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    regenerations: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads served from a valid entry
    pub hits: u64,
    /// Reads that had to create the entry
    pub misses: u64,
    /// Stale entries given a new value
    pub regenerations: u64,
    /// Entries removed by capacity eviction
    pub evictions: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Regenerations count as misses. Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.regenerations;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl CacheObserver for CacheStats {
    fn on_hit(&self, _entry: &CacheEntry) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_created(&self, _entry: &CacheEntry, from_miss: bool) {
        if from_miss {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_regenerated(&self, _entry: &CacheEntry) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
    }

    fn on_evicted(&self, _victims: &[CacheEntry], removed: usize) {
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
    }
}
