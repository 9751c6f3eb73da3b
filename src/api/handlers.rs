//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Each one makes a
//! single engine call and maps the result to a JSON body.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheEngine, CacheStats, EngineConfig, TracingObserver};
use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::models::{
    DeleteAllResponse, DeleteResponse, HealthResponse, KeysResponse, PutRequest, StatsResponse,
    ValueResponse,
};
use crate::store::{EntryStore, MemoryStore, SqliteStore, StoreError};

/// Application state shared across all handlers.
///
/// The engine is cheap to clone; shared state lives in its store.
#[derive(Clone)]
pub struct AppState {
    pub engine: CacheEngine,
    /// Counters fed by the engine's observer hooks
    pub stats: Arc<CacheStats>,
}

impl AppState {
    /// Creates an engine over `store` with tracing and stats observers.
    pub fn new(store: Arc<dyn EntryStore>, config: EngineConfig) -> Self {
        let stats = Arc::new(CacheStats::new());
        let engine = CacheEngine::new(store, config)
            .with_observer(Arc::new(TracingObserver))
            .with_observer(stats.clone());
        Self { engine, stats }
    }

    /// Wraps a prebuilt engine. `stats` should already be one of its observers.
    pub fn with_engine(engine: CacheEngine, stats: Arc<CacheStats>) -> Self {
        Self { engine, stats }
    }

    /// Opens the configured store and builds the state around it.
    pub async fn from_config(config: &Config) -> std::result::Result<Self, StoreError> {
        let store: Arc<dyn EntryStore> = match config.store_backend {
            StoreBackend::Sqlite => Arc::new(SqliteStore::connect(&config.database_url).await?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(store, config.engine_config()))
    }
}

/// Handler for GET /cache/:key
///
/// Always yields a value; misses and stale entries are regenerated.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>> {
    let entry = state.engine.get(&key).await?;
    Ok(Json(ValueResponse::new(entry.value)))
}

/// Handler for GET /cache
///
/// Lists every key after refreshing (and where needed regenerating) entries.
pub async fn list_handler(State(state): State<AppState>) -> Result<Json<KeysResponse>> {
    let entries = state.engine.get_all().await?;
    let keys = entries.into_iter().map(|entry| entry.key).collect();
    Ok(Json(KeysResponse::new(keys)))
}

/// Handler for POST /cache/:key
pub async fn put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutRequest>,
) -> Result<Json<ValueResponse>> {
    let entry = state.engine.put_or_update(&key, &req.value).await?;
    Ok(Json(ValueResponse::new(entry.value)))
}

/// Handler for DELETE /cache/:key
///
/// An absent key answers `{"ok": false}` rather than an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.engine.delete_one(&key).await?;
    Ok(Json(DeleteResponse::new(removed)))
}

/// Handler for DELETE /cache
pub async fn delete_all_handler(State(state): State<AppState>) -> Result<Json<DeleteAllResponse>> {
    let deleted = state.engine.delete_all().await?;
    Ok(Json(DeleteAllResponse::new(deleted)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let total_entries = state.engine.count().await?;
    Ok(Json(StatsResponse::new(
        &state.stats.snapshot(),
        total_entries,
    )))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
