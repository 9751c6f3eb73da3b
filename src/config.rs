//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EngineConfig;

/// Which entry store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// SQLite database at `database_url`
    Sqlite,
    /// Process memory, lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of entries kept after each eviction pass
    pub capacity: usize,
    /// Entry TTL in milliseconds
    pub ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Entry store backend
    pub store_backend: StoreBackend,
    /// SQLite connection string
    pub database_url: String,
}

const DEFAULT_CAPACITY: usize = 5;
const DEFAULT_TTL_MS: u64 = 500;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "sqlite://ttl_cache.db?mode=rwc";

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum live entries, non-zero (default: 5)
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds, non-zero (default: 500)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STORE_BACKEND` - `sqlite` or `memory` (default: sqlite)
    /// - `DATABASE_URL` - SQLite connection string (default: sqlite://ttl_cache.db?mode=rwc)
    pub fn from_env() -> Self {
        Self {
            capacity: Some(env_or("CACHE_CAPACITY", DEFAULT_CAPACITY))
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_CAPACITY),
            ttl_ms: Some(env_or("CACHE_TTL_MS", DEFAULT_TTL_MS))
                .filter(|ttl| *ttl > 0)
                .unwrap_or(DEFAULT_TTL_MS),
            server_port: env_or("SERVER_PORT", DEFAULT_PORT),
            store_backend: env_or("STORE_BACKEND", StoreBackend::Sqlite),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
        }
    }

    /// Engine limits derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.capacity, Duration::from_millis(self.ttl_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_ms: DEFAULT_TTL_MS,
            server_port: DEFAULT_PORT,
            store_backend: StoreBackend::Sqlite,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.ttl_ms, 500);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment so parallel tests don't race
        env::set_var("CACHE_CAPACITY", "0");
        env::remove_var("SERVER_PORT");
        env::remove_var("STORE_BACKEND");
        env::remove_var("DATABASE_URL");
        env::set_var("CACHE_TTL_MS", "0");

        let config = Config::from_env();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.ttl_ms, 500);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);

        env::set_var("CACHE_CAPACITY", "12");
        env::set_var("CACHE_TTL_MS", "250");
        env::set_var("STORE_BACKEND", "Memory");

        let config = Config::from_env();
        assert_eq!(config.capacity, 12);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.engine_config().ttl, Duration::from_millis(250));

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_TTL_MS");
        env::remove_var("STORE_BACKEND");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("sqlite".parse::<StoreBackend>(), Ok(StoreBackend::Sqlite));
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
