//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies. Entry timestamps
//! never leave the server.

use serde::Serialize;

use crate::cache::StatsSnapshot;

/// Response body for GET and POST /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    /// The entry's value
    pub value: String,
}

impl ValueResponse {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Response body for GET /cache
///
/// Lists keys under `value`, matching the single-entry shape.
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub value: Vec<String>,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self { value: keys }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Whether an entry was removed
    pub ok: bool,
}

impl DeleteResponse {
    pub fn new(removed: bool) -> Self {
        Self { ok: removed }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct DeleteAllResponse {
    pub ok: bool,
    /// Number of entries removed
    pub deleted: usize,
}

impl DeleteAllResponse {
    pub fn new(deleted: usize) -> Self {
        Self { ok: true, deleted }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of misses that created an entry
    pub misses: u64,
    /// Number of stale entries regenerated
    pub regenerations: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Hit rate (hits / reads)
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot
    pub fn new(stats: &StatsSnapshot, total_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            regenerations: stats.regenerations,
            evictions: stats.evictions,
            total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_response_serialize() {
        let json = serde_json::to_string(&ValueResponse::new("cached")).unwrap();
        assert_eq!(json, r#"{"value":"cached"}"#);
    }

    #[test]
    fn test_keys_response_serialize() {
        let resp = KeysResponse::new(vec!["a".to_string(), "b".to_string()]);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"value":["a","b"]}"#);
    }

    #[test]
    fn test_delete_responses_serialize() {
        let json = serde_json::to_string(&DeleteResponse::new(false)).unwrap();
        assert_eq!(json, r#"{"ok":false}"#);

        let json = serde_json::to_string(&DeleteAllResponse::new(3)).unwrap();
        assert_eq!(json, r#"{"ok":true,"deleted":3}"#);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let snapshot = StatsSnapshot {
            hits: 80,
            misses: 15,
            regenerations: 5,
            evictions: 2,
        };
        let resp = StatsResponse::new(&snapshot, 5);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 5);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
