//! Cache Entry Module
//!
//! Defines the stored record and the pure helpers the engine builds its policy on.

use rand::{distributions::Alphanumeric, Rng};

// == Cache Entry ==
/// A single persisted cache record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Store-assigned row id, used for batch deletion
    pub id: i64,
    /// Unique external identifier, immutable once created
    pub key: String,
    /// The cached payload
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Last write timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl CacheEntry {
    // == Refresh ==
    /// Pushes the expiry to `expires_at`, never moving it backward.
    pub fn refresh(&mut self, now: i64, expires_at: i64) {
        self.expires_at = self.expires_at.max(expires_at);
        self.updated_at = now;
    }
}

// == Validity ==
/// An entry is valid while its expiry lies strictly in the future.
///
/// Once `now` reaches `expires_at` the entry is stale.
pub fn is_valid(entry: &CacheEntry, now: i64) -> bool {
    entry.expires_at > now
}

// == Utility Functions ==
/// Length of generated values.
pub const GENERATED_VALUE_LENGTH: usize = 32;

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a random alphanumeric value for misses and stale entries.
pub fn random_value() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_VALUE_LENGTH)
        .map(char::from)
        .collect()
}
