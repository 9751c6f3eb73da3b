//! SQLite entry store
//!
//! Durable backend using sqlx. The uniqueness of `key` is enforced by the
//! table itself; upserts lean on `ON CONFLICT` so racing writers never see a
//! constraint violation.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use super::{EntryStore, StoreError, StoreResult, Upserted};
use crate::cache::CacheEntry;

const ENTRY_COLUMNS: &str = "id, key, value, expires_at, created_at, updated_at";

/// Entry store backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to `database_url` and runs migrations.
    ///
    /// In-memory databases are limited to one connection, since each
    /// connection would otherwise see its own empty database.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Get the underlying pool for advanced usage
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    async fn update_value(
        &self,
        key: &str,
        value: &str,
        now: i64,
    ) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE cache_entries
            SET value = ?, updated_at = ?
            WHERE key = ?
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(value)
        .bind(now)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }
}

fn entry_from_row(row: &SqliteRow) -> StoreResult<CacheEntry> {
    let corrupt = |e: sqlx::Error| StoreError::Corrupt(e.to_string());

    Ok(CacheEntry {
        id: row.try_get("id").map_err(corrupt)?,
        key: row.try_get("key").map_err(corrupt)?,
        value: row.try_get("value").map_err(corrupt)?,
        expires_at: row.try_get("expires_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn count_to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Upserted> {
        // A concurrent delete can land between the two statements; one retry
        // settles it because the insert then succeeds.
        for _ in 0..2 {
            if let Some(entry) = self.insert_if_absent(key, value, now, expires_at).await? {
                return Ok(Upserted {
                    entry,
                    created: true,
                });
            }
            if let Some(entry) = self.update_value(key, value, now).await? {
                return Ok(Upserted {
                    entry,
                    created: false,
                });
            }
        }

        Err(StoreError::Corrupt(format!(
            "Row for key '{}' neither inserted nor updated",
            key
        )))
    }

    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cache_entries (key, value, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO NOTHING
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn refresh(&self, id: i64, now: i64, expires_at: i64) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE cache_entries
            SET expires_at = MAX(expires_at, ?), updated_at = ?
            WHERE id = ?
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn regenerate(
        &self,
        stale: &CacheEntry,
        value: &str,
        now: i64,
        expires_at: i64,
    ) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE cache_entries
            SET value = ?, expires_at = ?, updated_at = ?
            WHERE id = ? AND value = ? AND updated_at = ? AND expires_at <= ?
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .bind(stale.id)
        .bind(&stale.value)
        .bind(stale.updated_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<CacheEntry>> {
        let rows = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM cache_entries"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn count_all(&self) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count_to_usize(row.get("count")))
    }

    async fn find_oldest_by_expiry(&self, limit: usize) -> StoreResult<Vec<CacheEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM cache_entries
            ORDER BY expires_at ASC, id ASC
            LIMIT ?
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn delete_by_key(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM cache_entries WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete_all(&self) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = memory_store().await;
        store.run_migrations().await.unwrap();
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = memory_store().await;

        let first = store.upsert("key1", "value1", 100, 600).await.unwrap();
        assert!(first.created);
        assert_eq!(first.entry.key, "key1");
        assert_eq!(first.entry.expires_at, 600);
        assert_eq!(first.entry.created_at, 100);

        let second = store.upsert("key1", "value2", 200, 9_999).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.entry.id, first.entry.id);
        assert_eq!(second.entry.value, "value2");
        assert_eq!(second.entry.expires_at, 600);
        assert_eq!(second.entry.updated_at, 200);
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_if_absent_and_find_by_key() {
        let store = memory_store().await;

        let created = store.insert_if_absent("key1", "first", 0, 500).await.unwrap().unwrap();
        assert!(store.insert_if_absent("key1", "second", 10, 510).await.unwrap().is_none());

        let found = store.find_by_key("key1").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.value, "first");
        assert!(store.find_by_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_touches_expiry_only() {
        let store = memory_store().await;
        let entry = store.upsert("key1", "v1", 0, 500).await.unwrap().entry;
        store.upsert("key1", "v2", 100, 0).await.unwrap();

        let refreshed = store.refresh(entry.id, 200, 700).await.unwrap().unwrap();
        assert_eq!(refreshed.value, "v2");
        assert_eq!(refreshed.expires_at, 700);
        assert_eq!(refreshed.updated_at, 200);

        let refreshed = store.refresh(entry.id, 300, 600).await.unwrap().unwrap();
        assert_eq!(refreshed.expires_at, 700);
    }

    #[tokio::test]
    async fn test_refresh_missing_row() {
        let store = memory_store().await;
        let entry = store.upsert("key1", "value1", 0, 500).await.unwrap().entry;

        assert!(store.delete_by_key("key1").await.unwrap());
        assert!(!store.delete_by_key("key1").await.unwrap());
        assert!(store.refresh(entry.id, 100, 600).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_regenerate_only_replaces_unchanged_stale_row() {
        let store = memory_store().await;
        let stale = store.upsert("key1", "old", 0, 500).await.unwrap().entry;

        // Not stale yet
        assert!(store.regenerate(&stale, "new", 400, 900).await.unwrap().is_none());

        let fresh = store.regenerate(&stale, "new", 600, 1_100).await.unwrap().unwrap();
        assert_eq!(fresh.value, "new");
        assert_eq!(fresh.expires_at, 1_100);
        assert_eq!(fresh.updated_at, 600);

        // The row moved on since `stale` was read
        assert!(store.regenerate(&stale, "newer", 2_000, 2_500).await.unwrap().is_none());
        assert_eq!(store.find_by_key("key1").await.unwrap().unwrap(), fresh);
    }

    #[tokio::test]
    async fn test_find_oldest_by_expiry() {
        let store = memory_store().await;
        store.upsert("late", "v", 0, 300).await.unwrap();
        store.upsert("early", "v", 0, 100).await.unwrap();
        store.upsert("tie", "v", 0, 100).await.unwrap();

        let oldest = store.find_oldest_by_expiry(2).await.unwrap();
        let keys: Vec<&str> = oldest.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["early", "tie"]);

        assert_eq!(store.find_oldest_by_expiry(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_by_ids() {
        let store = memory_store().await;
        let a = store.upsert("a", "v", 0, 100).await.unwrap().entry;
        let b = store.upsert("b", "v", 0, 100).await.unwrap().entry;
        store.upsert("c", "v", 0, 100).await.unwrap();

        assert_eq!(store.delete_by_ids(&[a.id, b.id]).await.unwrap(), 2);
        // Already deleted ids are a no-op
        assert_eq!(store.delete_by_ids(&[a.id, b.id]).await.unwrap(), 0);
        assert_eq!(store.delete_by_ids(&[]).await.unwrap(), 0);
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let store = memory_store().await;
        store.upsert("a", "v", 0, 100).await.unwrap();
        store.upsert("b", "v", 0, 100).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.count_all().await.unwrap(), 0);
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let store = memory_store().await;
        store.pool().close().await;

        let result = store.count_all().await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
