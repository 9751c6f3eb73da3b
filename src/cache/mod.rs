//! Cache Module
//!
//! Entry lifecycle: TTL refresh, regeneration of stale values and
//! capacity-based eviction over a pluggable entry store.

mod clock;
mod engine;
mod entry;
mod observer;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{validate_key, validate_value, CacheEngine, EngineConfig};
pub use entry::{current_timestamp_ms, is_valid, random_value, CacheEntry, GENERATED_VALUE_LENGTH};
pub use observer::{CacheObserver, TracingObserver};
pub use stats::{CacheStats, StatsSnapshot};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
