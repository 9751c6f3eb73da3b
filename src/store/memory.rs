//! In-process entry store.
//!
//! Keeps rows in a `HashMap` keyed by cache key behind an async `RwLock`.
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EntryStore, StoreResult, Upserted};
use crate::cache::CacheEntry;

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Rows by key
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Last assigned row id
    last_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_entry(&self, key: &str, value: &str, now: i64, expires_at: i64) -> CacheEntry {
        CacheEntry {
            id: self.last_id.fetch_add(1, Ordering::SeqCst) + 1,
            key: key.to_string(),
            value: value.to_string(),
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Upserted> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get_mut(key) {
            existing.value = value.to_string();
            existing.updated_at = now;
            return Ok(Upserted {
                entry: existing.clone(),
                created: false,
            });
        }

        let entry = self.new_entry(key, value, now, expires_at);
        entries.insert(key.to_string(), entry.clone());

        Ok(Upserted {
            entry,
            created: true,
        })
    }

    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(None);
        }

        let entry = self.new_entry(key, value, now, expires_at);
        entries.insert(key.to_string(), entry.clone());
        Ok(Some(entry))
    }

    async fn refresh(&self, id: i64, now: i64, expires_at: i64) -> StoreResult<Option<CacheEntry>> {
        let mut entries = self.entries.write().await;

        Ok(entries.values_mut().find(|e| e.id == id).map(|stored| {
            stored.refresh(now, expires_at);
            stored.clone()
        }))
    }

    async fn regenerate(
        &self,
        stale: &CacheEntry,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>> {
        let mut entries = self.entries.write().await;

        match entries.get_mut(&stale.key) {
            Some(stored)
                if stored.id == stale.id
                    && stored.value == stale.value
                    && stored.updated_at == stale.updated_at
                    && stored.expires_at <= now =>
            {
                stored.value = value.to_string();
                stored.expires_at = expires_at;
                stored.updated_at = now;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<CacheEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn count_all(&self) -> StoreResult<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn find_oldest_by_expiry(&self, limit: usize) -> StoreResult<Vec<CacheEntry>> {
        let mut oldest: Vec<CacheEntry> = self.entries.read().await.values().cloned().collect();
        oldest.sort_by_key(|entry| (entry.expires_at, entry.id));
        oldest.truncate(limit);
        Ok(oldest)
    }

    async fn delete_by_key(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> StoreResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !ids.contains(&entry.id));
        Ok(before - entries.len())
    }

    async fn delete_all(&self) -> StoreResult<usize> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
