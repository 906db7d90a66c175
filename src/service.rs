//! Cache-first request orchestrator.
//!
//! `request` answers from a fresh cache entry when it can, otherwise joins
//! or starts a single upstream fetch for the key. A successful fetch is
//! written through to the cache; a failed one falls back to the stale entry
//! when there is one.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{current_timestamp_ms, CacheStats, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{ProxyError, Result, UpstreamError};
use crate::inflight::{Flight, InFlightRegistry};
use crate::upstream::{
    EndpointReport, EndpointSelector, FailoverConfig, HttpTransport, ReqwestTransport,
    RequestSpec, RetryExecutor,
};

/// What a caller gets back from `request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheFirstResponse {
    pub data: Value,
    /// True for fresh hits and for stale fallbacks
    pub from_cache: bool,
    /// Unix ms at which the response was produced
    pub timestamp: u64,
    /// Set only when `data` is a stale fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheFirstResponse {
    fn cached(data: Value) -> Self {
        Self {
            data,
            from_cache: true,
            timestamp: current_timestamp_ms(),
            error: None,
        }
    }

    fn fresh(data: Value) -> Self {
        Self {
            data,
            from_cache: false,
            timestamp: current_timestamp_ms(),
            error: None,
        }
    }

    fn stale(data: Value, error: String) -> Self {
        Self {
            data,
            from_cache: true,
            timestamp: current_timestamp_ms(),
            error: Some(error),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.from_cache && self.error.is_some()
    }
}

type FlightOutcome = Result<CacheFirstResponse>;

// == Service ==
/// Cheap to clone; clones share the cache, stats and in-flight registry.
#[derive(Clone)]
pub struct CacheFirstService {
    cache: SharedCache,
    selector: Arc<EndpointSelector>,
    retry: RetryExecutor,
    in_flight: InFlightRegistry<FlightOutcome>,
}

impl CacheFirstService {
    pub fn new(cache: SharedCache, selector: Arc<EndpointSelector>, retry: RetryExecutor) -> Self {
        Self {
            cache,
            selector,
            retry,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Wires a service from configuration with the given transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let cache = CacheStore::new(config.cache.max_entries, config.cache.default_ttl).into_shared();
        let selector = EndpointSelector::new(
            config.upstream.endpoints.clone(),
            transport,
            FailoverConfig::from(&config.upstream),
        );
        Self::new(cache, Arc::new(selector), RetryExecutor::new(config.retry.clone()))
    }

    /// Wires a service that talks to the network through `reqwest`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.upstream)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Request ==
    /// Returns data for `key`, from cache when fresh, else from upstream.
    ///
    /// Concurrent calls for the same key share one upstream fetch. The fetch
    /// runs in its own task, so a caller giving up does not cancel it for
    /// the others.
    ///
    /// # Errors
    /// `ProxyError::Unavailable` when the upstream is exhausted and nothing
    /// is cached for `key`, fresh or stale.
    pub async fn request(&self, key: &str, spec: &RequestSpec) -> Result<CacheFirstResponse> {
        if key.is_empty() {
            return Err(ProxyError::InvalidRequest("Key cannot be empty".to_string()));
        }
        spec.validate()
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

        if !spec.skip_cache {
            // Expired entries stay put for the stale fallback below
            let cached = self.cache.write().await.lookup(key);
            if let Some(data) = cached {
                debug!(key, "Cache hit");
                return Ok(CacheFirstResponse::cached(data));
            }
            debug!(key, "Cache miss");
        }

        let receiver = match self.in_flight.join(key) {
            Flight::Follower(receiver) => {
                debug!(key, "Joining in-flight request");
                receiver
            }
            Flight::Leader(leader) => {
                let receiver = leader.subscribe();
                let service = self.clone();
                let key = key.to_string();
                let spec = spec.clone();
                tokio::spawn(async move {
                    let outcome = service.fetch_and_store(&key, &spec).await;
                    leader.complete(outcome);
                });
                receiver
            }
        };

        InFlightRegistry::wait(receiver).await.unwrap_or_else(|| {
            Err(ProxyError::Internal(format!(
                "fetch for '{key}' ended without a result"
            )))
        })
    }

    async fn fetch_and_store(&self, key: &str, spec: &RequestSpec) -> FlightOutcome {
        let context = format!("{} {}", spec.method, spec.url);

        match self.retry.execute(&context, || self.fetch_payload(spec)).await {
            Ok(data) => {
                let ttl = {
                    let mut cache = self.cache.write().await;
                    let ttl = spec.cache_ttl().unwrap_or(cache.default_ttl());
                    cache.set(key, data.clone(), Some(ttl));
                    ttl
                };
                info!(key, ttl_ms = ttl.as_millis() as u64, "Cached fresh upstream response");
                Ok(CacheFirstResponse::fresh(data))
            }
            Err(err) => {
                let stale = self.cache.read().await.get_stale(key);
                match stale {
                    Some(entry) => {
                        warn!(
                            key,
                            error = %err,
                            written_at = entry.created_at,
                            "Upstream failed, serving stale cache entry"
                        );
                        Ok(CacheFirstResponse::stale(
                            entry.data,
                            format!("upstream request failed, serving stale data: {err}"),
                        ))
                    }
                    None => {
                        error!(key, error = %err, "Upstream failed and nothing is cached");
                        Err(ProxyError::Unavailable {
                            key: key.to_string(),
                            reason: err.to_string(),
                        })
                    }
                }
            }
        }
    }

    async fn fetch_payload(&self, spec: &RequestSpec) -> std::result::Result<Value, UpstreamError> {
        let response = self.selector.execute(spec).await?;
        response.into_payload()
    }

    // == Cache Management ==
    /// Fetches `key` bypassing the cache so the result lands in it.
    ///
    /// Failures are logged, never returned.
    pub async fn warmup_cache(&self, key: &str, spec: &RequestSpec) {
        let spec = spec.clone().bypass_cache();
        match self.request(key, &spec).await {
            Ok(response) if response.is_stale() => {
                warn!(key, error = ?response.error, "Cache warm-up kept stale data")
            }
            Ok(_) => info!(key, "Cache warmed up"),
            Err(err) => warn!(key, error = %err, "Cache warm-up failed"),
        }
    }

    /// Removes one entry. Returns whether anything was removed.
    pub async fn clear_cache(&self, key: &str) -> bool {
        let removed = self.cache.write().await.delete(key);
        if removed {
            info!(key, "Cache entry cleared");
        }
        removed
    }

    /// Removes every entry. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let removed = self.cache.write().await.clear();
        info!(removed, "Cache cleared");
        removed
    }

    /// True when a fresh entry exists. Has no side effects on the store.
    pub async fn is_cache_valid(&self, key: &str) -> bool {
        self.cache.read().await.is_fresh(key)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    /// Number of keys with a fetch in progress.
    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    pub fn endpoint_stats(&self) -> Vec<EndpointReport> {
        self.selector.snapshot()
    }
}
