//! Error types for the cache-first access layer
//!
//! Provides unified error handling using thiserror. `UpstreamError` covers
//! everything that can go wrong talking to the upstream; `ProxyError` is what
//! callers of the orchestrator and the HTTP surface see.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Upstream Error Enum ==
/// Failure of a single upstream attempt, or of a whole attempt sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status
    #[error("HTTP {status} from {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
        /// Set for 429, and for 403 responses reporting an exhausted quota
        rate_limited: bool,
    },

    /// The attempt did not complete within the per-attempt timeout
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Connection, DNS or protocol failure
    #[error("network error calling {url}: {message}")]
    Network { url: String, message: String },

    /// A 2xx body that could not be decoded
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The request description itself is unusable
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    /// Every candidate endpoint failed for one attempt
    #[error("all {} endpoint(s) failed: {}", .failures.len(), .failures.join("; "))]
    AllEndpointsFailed {
        failures: Vec<String>,
        last_status: Option<u16>,
        rate_limited: bool,
    },

    /// The retry executor gave up
    #[error("{context} failed after {attempts} attempt(s): {message}")]
    RetriesExhausted {
        context: String,
        attempts: u32,
        message: String,
    },
}

impl UpstreamError {
    /// HTTP status carried by this error, if any.
    ///
    /// Rate-limited aggregates report 429 so the retry executor applies
    /// rate-limit backoff to them.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::AllEndpointsFailed {
                rate_limited: true, ..
            } => Some(429),
            UpstreamError::AllEndpointsFailed { last_status, .. } => *last_status,
            _ => None,
        }
    }

    /// True when the upstream signalled throttling unambiguously.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            UpstreamError::Status { rate_limited, .. } => *rate_limited,
            UpstreamError::AllEndpointsFailed { rate_limited, .. } => *rate_limited,
            _ => false,
        }
    }
}

// == Proxy Error Enum ==
/// Unified error type for the orchestrator and HTTP surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream failure that was not recovered
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Upstream exhausted and nothing cached, fresh or stale
    #[error("request for '{key}' failed and no cached data is available: {reason}")]
    Unavailable { key: String, reason: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, ProxyError>;
