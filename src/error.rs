//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the cache server.
///
/// Misses, stale entries and capacity overflow are normal control flow and
/// never show up here.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store unreachable or returned garbage
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// Malformed key or value, rejected before touching the store
    #[error("Invalid request: {0}")]
    Validation(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Validation(_) => StatusCode::BAD_REQUEST,
        };

        if let CacheError::StoreUnavailable(err) = &self {
            tracing::error!("Store operation failed: {}", err);
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
