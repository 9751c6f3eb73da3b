//! TTL Cache - a key/value cache server with regenerating entries
//!
//! Stale values are regenerated on access instead of dropped, and the
//! soonest-expiring entries are evicted once the store exceeds its capacity.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{CacheEngine, EngineConfig};
pub use config::Config;
