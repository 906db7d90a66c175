//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies. Cache-first
//! responses themselves are serialized straight from `CacheFirstResponse`.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::upstream::EndpointReport;

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct ValidityResponse {
    pub key: String,
    /// True when a fresh entry exists
    pub valid: bool,
}

impl ValidityResponse {
    pub fn new(key: impl Into<String>, valid: bool) -> Self {
        Self {
            key: key.into(),
            valid,
        }
    }
}

/// Response body for `DELETE /cache/:key` and `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn key(key: &str) -> Self {
        Self {
            message: format!("Key '{key}' cleared successfully"),
            removed: 1,
        }
    }

    pub fn all(removed: usize) -> Self {
        Self {
            message: format!("Cleared {removed} cache entries"),
            removed,
        }
    }
}

/// Response body for `POST /warmup`
#[derive(Debug, Clone, Serialize)]
pub struct WarmupResponse {
    pub message: String,
    pub key: String,
}

impl WarmupResponse {
    pub fn accepted(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Warm-up scheduled for '{key}'"),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub endpoints: Vec<EndpointReport>,
    /// Keys with an upstream fetch in progress
    pub pending_requests: usize,
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
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
