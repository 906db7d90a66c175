//! API Handlers
//!
//! HTTP request handlers for each endpoint. Handlers are thin: they
//! validate input, call the orchestrator and shape the response.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::cache::create_cache_key;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::models::{
    CachedRequest, ClearResponse, HealthResponse, StatsResponse, ValidityResponse,
    WarmupResponse,
};
use crate::service::{CacheFirstResponse, CacheFirstService};
use crate::upstream::RequestSpec;

/// Header reporting how a proxied response was served.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: CacheFirstService,
}

impl AppState {
    pub fn new(service: CacheFirstService) -> Self {
        Self { service }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Wires the cache store, failover selector and retry executor.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheFirstService::from_config(config)?))
    }
}

/// Handler for POST /request
///
/// Cache-first fetch of `request`, stored under the resolved key.
pub async fn request_handler(
    State(state): State<AppState>,
    Json(body): Json<CachedRequest>,
) -> Result<Json<CacheFirstResponse>> {
    let key = validated_key(&body)?;
    let response = state.service.request(&key, &body.request).await?;
    Ok(Json(response))
}

/// Handler for POST /warmup
///
/// Schedules a cache-bypassing fetch and returns immediately.
pub async fn warmup_handler(
    State(state): State<AppState>,
    Json(body): Json<CachedRequest>,
) -> Result<(StatusCode, Json<WarmupResponse>)> {
    let key = validated_key(&body)?;

    let service = state.service.clone();
    let task_key = key.clone();
    tokio::spawn(async move {
        service.warmup_cache(&task_key, &body.request).await;
    });

    Ok((StatusCode::ACCEPTED, Json(WarmupResponse::accepted(key))))
}

/// Handler for GET /github/*path
///
/// Cache-first GET of an upstream path. `refresh=true` bypasses fresh
/// entries; every other query parameter is forwarded and becomes part of
/// the cache key.
pub async fn github_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(mut query): Query<BTreeMap<String, String>>,
) -> Result<Response> {
    let refresh = query
        .remove("refresh")
        .is_some_and(|v| v == "true" || v == "1");

    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(ProxyError::InvalidRequest("Path cannot be empty".to_string()));
    }

    let key = create_cache_key(&format!("github:/{path}"), &query);
    let url = if query.is_empty() {
        format!("/{path}")
    } else {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&query)
            .finish();
        format!("/{path}?{encoded}")
    };

    let mut spec = RequestSpec::get(url);
    if refresh {
        spec = spec.bypass_cache();
    }

    debug!(key = %key, refresh, "Proxying upstream path");
    let response = state.service.request(&key, &spec).await?;

    let served = if response.is_stale() {
        "STALE"
    } else if response.from_cache {
        "HIT"
    } else {
        "MISS"
    };

    Ok((
        [(X_CACHE, HeaderValue::from_static(served))],
        Json(response),
    )
        .into_response())
}

/// Handler for GET /cache/:key
///
/// Reports whether a fresh entry exists for the key.
pub async fn validity_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ValidityResponse> {
    let valid = state.service.is_cache_valid(&key).await;
    Json(ValidityResponse::new(key, valid))
}

/// Handler for DELETE /cache/:key
pub async fn clear_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ClearResponse>> {
    if state.service.clear_cache(&key).await {
        Ok(Json(ClearResponse::key(&key)))
    } else {
        Err(ProxyError::NotFound(key))
    }
}

/// Handler for DELETE /cache
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.service.clear_all().await;
    Json(ClearResponse::all(removed))
}

/// Handler for GET /cache/stats
///
/// Returns store statistics, per-endpoint scores and the pending count.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.service.cache_stats().await,
        endpoints: state.service.endpoint_stats(),
        pending_requests: state.service.pending_requests(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn validated_key(body: &CachedRequest) -> Result<String> {
    if let Some(error_msg) = body.validate() {
        return Err(ProxyError::InvalidRequest(error_msg));
    }
    body.cache_key()
        .ok_or_else(|| ProxyError::InvalidRequest("Missing cache key".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::{MockReply, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn state(transport: MockTransport) -> AppState {
        let mut config = Config::default();
        config.upstream.endpoints = vec!["http://upstream.test".to_string()];
        config.retry.attempts = 1;
        AppState::new(CacheFirstService::with_transport(&config, Arc::new(transport)))
    }

    fn body(json: serde_json::Value) -> Json<CachedRequest> {
        Json(serde_json::from_value(json).unwrap())
    }

    #[tokio::test]
    async fn test_request_handler_fetches_then_hits() {
        let state = state(MockTransport::new().with_fallback(MockReply::Json(200, json!({"n": 1}))));

        let req = json!({"key": "k", "request": {"url": "/x"}});
        let Json(first) = request_handler(State(state.clone()), body(req.clone()))
            .await
            .unwrap();
        assert!(!first.from_cache);

        let Json(second) = request_handler(State(state), body(req)).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.data, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_request_handler_rejects_missing_key() {
        let state = state(MockTransport::new());
        let result = request_handler(State(state), body(json!({"request": {"url": "/x"}}))).await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_key_handler_not_found() {
        let state = state(MockTransport::new());
        let result = clear_key_handler(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(ProxyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_validity_and_clear() {
        let state = state(MockTransport::new());
        state
            .service
            .cache()
            .write()
            .await
            .set("k", json!(1), None);

        let Json(valid) = validity_handler(State(state.clone()), Path("k".to_string())).await;
        assert!(valid.valid);

        let Json(cleared) = clear_key_handler(State(state.clone()), Path("k".to_string()))
            .await
            .unwrap();
        assert_eq!(cleared.removed, 1);

        let Json(valid) = validity_handler(State(state), Path("k".to_string())).await;
        assert!(!valid.valid);
    }

    #[tokio::test]
    async fn test_stats_handler_reports_endpoints() {
        let state = state(MockTransport::new());
        let Json(stats) = stats_handler(State(state)).await;
        assert_eq!(stats.cache.size, 0);
        assert_eq!(stats.endpoints.len(), 1);
        assert_eq!(stats.endpoints[0].endpoint, "http://upstream.test");
        assert_eq!(stats.pending_requests, 0);
    }
}
