//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_key_handler, github_handler, health_handler, request_handler,
    stats_handler, validity_handler, warmup_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /request` - Cache-first fetch of a described request
/// - `POST /warmup` - Background fetch that only populates the cache
/// - `GET /github/*path` - Cache-first GET proxy to the upstream
/// - `GET /cache/stats` - Store, endpoint and in-flight statistics
/// - `GET /cache/:key` - Whether a fresh entry exists
/// - `DELETE /cache/:key` - Remove one entry
/// - `DELETE /cache` - Remove every entry
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/request", post(request_handler))
        .route("/warmup", post(warmup_handler))
        .route("/github/*path", get(github_handler))
        .route("/cache", delete(clear_all_handler))
        .route("/cache/stats", get(stats_handler))
        .route(
            "/cache/:key",
            get(validity_handler).delete(clear_key_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
