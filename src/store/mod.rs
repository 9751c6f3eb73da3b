//! Entry Store Module
//!
//! The persistence contract the cache engine runs on, plus its backends.

mod error;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::cache::CacheEntry;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store-level result type.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an upsert.
#[derive(Debug, Clone)]
pub struct Upserted {
    /// The row as stored after the write
    pub entry: CacheEntry,
    /// Whether a new row was created
    pub created: bool,
}

/// Keyed record set backing the cache.
///
/// Every operation is atomic with respect to a single key. Failures of the
/// backing medium surface as [`StoreError`] and are never retried here.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Inserts `key` with `expires_at` if absent, otherwise overwrites the value only.
    ///
    /// The expiry of an existing row is left untouched. A lost creation race
    /// resolves to an update rather than a uniqueness error.
    async fn upsert(&self, key: &str, value: &str, now: i64, expires_at: i64)
        -> StoreResult<Upserted>;

    /// Creates `key` only if it is absent. Returns `None` when the key already exists.
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>>;

    /// Pushes the expiry of row `id` to `expires_at`, never moving it backward.
    ///
    /// Only the expiry and `updated_at` change, so a value written since the
    /// row was read is kept. Returns the row as stored, or `None` if it is gone.
    async fn refresh(&self, id: i64, now: i64, expires_at: i64) -> StoreResult<Option<CacheEntry>>;

    /// Replaces the value of a stale row and sets its expiry.
    ///
    /// Applies only while the row is still stale at `now` and still holds the
    /// value and `updated_at` of `stale`. Returns `None` if the row was
    /// written, refreshed or removed in the meantime.
    async fn regenerate(
        &self,
        stale: &CacheEntry,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>>;

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<CacheEntry>>;

    /// Returns every row, in no particular order.
    async fn find_all(&self) -> StoreResult<Vec<CacheEntry>>;

    async fn count_all(&self) -> StoreResult<usize>;

    /// Returns at most `limit` rows, soonest-expiring first. Older rows win ties.
    async fn find_oldest_by_expiry(&self, limit: usize) -> StoreResult<Vec<CacheEntry>>;

    /// Returns true if a row was removed.
    async fn delete_by_key(&self, key: &str) -> StoreResult<bool>;

    /// Deletes the given ids, ignoring ones already gone. Returns how many were removed.
    async fn delete_by_ids(&self, ids: &[i64]) -> StoreResult<usize>;

    async fn delete_all(&self) -> StoreResult<usize>;
}
