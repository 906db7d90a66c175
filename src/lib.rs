//! Upstream Cache - a cache-first access layer for rate-limited REST APIs
//!
//! Serves repeated reads from a TTL store, collapses concurrent fetches for
//! the same key, fails over between upstream endpoints and falls back to
//! stale data when the upstream cannot be reached.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod inflight;
pub mod models;
pub mod service;
pub mod tasks;
pub mod upstream;

pub use api::{create_router, AppState};
pub use cache::{create_cache_key, CacheStore, SharedCache};
pub use config::Config;
pub use error::{ProxyError, UpstreamError};
pub use service::{CacheFirstResponse, CacheFirstService};
pub use tasks::spawn_cleanup_task;
pub use upstream::{HttpTransport, RequestSpec, ReqwestTransport};
