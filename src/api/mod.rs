//! API Module
//!
//! HTTP handlers and routing for the cache-first access layer.
//!
//! # Endpoints
//! - `POST /request` - Cache-first fetch of a described request
//! - `POST /warmup` - Populate the cache in the background
//! - `GET /github/*path` - Cache-first GET proxy to the upstream
//! - `GET /cache/stats` - Cache and endpoint statistics
//! - `GET /cache/:key` - Freshness check for a key
//! - `DELETE /cache/:key` - Remove a key
//! - `DELETE /cache` - Remove every key
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
