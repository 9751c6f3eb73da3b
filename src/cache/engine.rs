//! Cache Engine Module
//!
//! Entry lifecycle policy on top of an [`EntryStore`]: refresh on access,
//! regeneration of stale values, and eviction of the soonest-expiring
//! entries once the store grows past capacity.
//!
//! The engine holds no cache state of its own. Everything shared lives in the
//! store, so clones of an engine can serve requests in parallel.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{
    is_valid, random_value, CacheEntry, CacheObserver, Clock, SystemClock, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};
use crate::store::{EntryStore, Upserted};

// == Engine Config ==
/// Engine-wide limits. A single TTL applies to every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Live entry count restored by each eviction pass
    pub capacity: usize,
    /// Idle time after which an entry turns stale; must be non-zero
    pub ttl: Duration,
}

impl EngineConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }

    /// TTL in milliseconds, saturating for absurdly long durations.
    pub fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            ttl: Duration::from_millis(500),
        }
    }
}

// == Cache Engine ==
#[derive(Clone)]
pub struct CacheEngine {
    store: Arc<dyn EntryStore>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn CacheObserver>>,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine over `store` using wall-clock time and no observers.
    pub fn new(store: Arc<dyn EntryStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            observers: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // == Put Or Update ==
    /// Stores `value` under `key` and refreshes its TTL.
    ///
    /// Eviction only runs when the key was new. Overwriting an existing key
    /// never triggers it, even if the store is already over capacity.
    pub async fn put_or_update(&self, key: &str, value: &str) -> Result<CacheEntry> {
        validate_key(key)?;
        validate_value(value)?;

        let now = self.clock.now_ms();
        let Upserted { mut entry, created } = self
            .store
            .upsert(key, value, now, self.expiry_from(now))
            .await?;

        if created {
            self.notify(|o| o.on_created(&entry, false));
            self.evict_oldest_if_over_capacity().await?;
        }

        let now = self.clock.now_ms();
        match self.refresh(&entry, now).await? {
            Some(refreshed) => Ok(refreshed),
            None => {
                entry.refresh(now, self.expiry_from(now));
                Ok(entry)
            }
        }
    }

    // == Get ==
    /// Returns the entry for `key`, never failing on a miss.
    ///
    /// - absent: a random value is generated and stored
    /// - valid: the TTL is refreshed, the value kept
    /// - stale: the value is regenerated and the TTL refreshed
    ///
    /// A write that lands between the read and the refresh wins: its value is
    /// returned rather than overwritten.
    pub async fn get(&self, key: &str) -> Result<CacheEntry> {
        validate_key(key)?;

        let Some(entry) = self.store.find_by_key(key).await? else {
            return self.create_on_miss(key).await;
        };

        let now = self.clock.now_ms();
        if is_valid(&entry, now) {
            return match self.refresh(&entry, now).await? {
                Some(refreshed) => {
                    self.notify(|o| o.on_hit(&refreshed));
                    Ok(refreshed)
                }
                None => self.create_on_miss(key).await,
            };
        }

        if let Some(regenerated) = self.regenerate(&entry, now).await? {
            return Ok(regenerated);
        }
        match self.refresh_current(key, now).await? {
            Some(current) => Ok(current),
            None => self.create_on_miss(key).await,
        }
    }

    async fn create_on_miss(&self, key: &str) -> Result<CacheEntry> {
        let now = self.clock.now_ms();
        let expires_at = self.expiry_from(now);

        if let Some(entry) = self
            .store
            .insert_if_absent(key, &random_value(), now, expires_at)
            .await?
        {
            self.notify(|o| o.on_created(&entry, true));
            self.evict_oldest_if_over_capacity().await?;
            return Ok(entry);
        }

        // Another caller created the row first; its value stands.
        if let Some(current) = self.refresh_current(key, now).await? {
            return Ok(current);
        }

        // The winning row was deleted again before it could be read.
        let Upserted { entry, created } = self
            .store
            .upsert(key, &random_value(), now, expires_at)
            .await?;
        if created {
            self.notify(|o| o.on_created(&entry, true));
            self.evict_oldest_if_over_capacity().await?;
        }
        Ok(entry)
    }

    // == Get All ==
    /// Returns every entry, regenerating stale ones and refreshing valid ones.
    ///
    /// Regenerated entries come first. Rows deleted while the listing runs are
    /// left out.
    pub async fn get_all(&self) -> Result<Vec<CacheEntry>> {
        let now = self.clock.now_ms();
        let (valid, stale): (Vec<_>, Vec<_>) = self
            .store
            .find_all()
            .await?
            .into_iter()
            .partition(|entry| is_valid(entry, now));

        let mut listed = Vec::with_capacity(valid.len() + stale.len());

        for entry in stale {
            let settled = match self.regenerate(&entry, now).await? {
                Some(regenerated) => Some(regenerated),
                None => self.refresh_current(&entry.key, now).await?,
            };
            listed.extend(settled);
        }

        for entry in valid {
            listed.extend(self.refresh(&entry, now).await?);
        }

        Ok(listed)
    }

    // == Delete ==
    /// Removes `key`. An absent key is not an error and returns false.
    pub async fn delete_one(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let removed = self.store.delete_by_key(key).await?;
        if removed {
            self.notify(|o| o.on_deleted(1));
        }
        Ok(removed)
    }

    /// Removes every entry and returns how many were deleted.
    pub async fn delete_all(&self) -> Result<usize> {
        let removed = self.store.delete_all().await?;
        self.notify(|o| o.on_deleted(removed));
        Ok(removed)
    }

    // == Eviction ==
    /// Deletes the soonest-expiring entries until at most `capacity` remain.
    ///
    /// Since every access pushes `expires_at` forward, the soonest-expiring
    /// entries are the ones touched longest ago. Returns how many rows this
    /// pass removed; concurrent passes may overlap and remove fewer.
    pub async fn evict_oldest_if_over_capacity(&self) -> Result<usize> {
        let count = self.store.count_all().await?;
        if count <= self.config.capacity {
            return Ok(0);
        }

        let excess = count - self.config.capacity;
        let victims = self.store.find_oldest_by_expiry(excess).await?;
        let ids: Vec<i64> = victims.iter().map(|entry| entry.id).collect();
        let removed = self.store.delete_by_ids(&ids).await?;

        self.notify(|o| o.on_evicted(&victims, removed));
        Ok(removed)
    }

    // == Count ==
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.count_all().await?)
    }

    fn expiry_from(&self, now: i64) -> i64 {
        now.saturating_add(self.config.ttl_ms())
    }

    /// Extends the TTL of `entry`'s row, keeping whatever value it holds now.
    async fn refresh(&self, entry: &CacheEntry, now: i64) -> Result<Option<CacheEntry>> {
        let refreshed = self
            .store
            .refresh(entry.id, now, self.expiry_from(now))
            .await?;
        if refreshed.is_none() {
            debug!("Cache entry for key {} was removed before it could be refreshed", entry.key);
        }
        Ok(refreshed)
    }

    /// Gives a stale entry a new value, unless its row changed since it was read.
    async fn regenerate(&self, stale: &CacheEntry, now: i64) -> Result<Option<CacheEntry>> {
        let regenerated = self
            .store
            .regenerate(stale, &random_value(), now, self.expiry_from(now))
            .await?;
        match &regenerated {
            Some(entry) => self.notify(|o| o.on_regenerated(entry)),
            None => debug!("Cache entry for key {} changed before it could be regenerated", stale.key),
        }
        Ok(regenerated)
    }

    /// Re-reads `key` after a conflicting write and refreshes the row as found.
    async fn refresh_current(&self, key: &str, now: i64) -> Result<Option<CacheEntry>> {
        let Some(current) = self.store.find_by_key(key).await? else {
            return Ok(None);
        };
        let refreshed = self.refresh(&current, now).await?;
        if let Some(entry) = &refreshed {
            self.notify(|o| o.on_hit(entry));
        }
        Ok(refreshed)
    }

    fn notify(&self, event: impl Fn(&dyn CacheObserver)) {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }
}

// == Validation ==
/// Rejects empty or oversized keys.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Validation("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::Validation(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Rejects empty or oversized values.
pub fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CacheError::Validation("Value cannot be empty".to_string()));
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(CacheError::Validation(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}
