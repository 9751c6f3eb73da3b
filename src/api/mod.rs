//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET /cache/:key` - Fetch a value by key
//! - `POST /cache/:key` - Create or update a value
//! - `DELETE /cache/:key` - Delete a key
//! - `GET /cache` - List all keys
//! - `DELETE /cache` - Delete all keys
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
