//! Endpoint failover with adaptive ordering.
//!
//! Every logical call is tried against the configured base endpoints in
//! score order until one answers 2xx. Scores blend success rate with how
//! recently the endpoint was used, so a reliable endpoint drifts to the
//! front and a failing one drifts back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::current_timestamp_ms;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

use super::request::{RequestSpec, UpstreamRequest};
use super::transport::{HttpTransport, UpstreamResponse};

/// Window over which recency decays from 1 to 0.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

const SUCCESS_WEIGHT: f64 = 0.7;
const RECENCY_WEIGHT: f64 = 0.3;

// == Endpoint Statistics ==
/// Attempt counters for one base endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EndpointStats {
    pub success_count: u64,
    pub total_count: u64,
    /// Unix ms of the last attempt, successful or not
    pub last_used_at: Option<u64>,
}

impl EndpointStats {
    pub fn record(&mut self, success: bool, now: u64) {
        self.total_count += 1;
        if success {
            self.success_count += 1;
        }
        self.last_used_at = Some(now);
    }

    pub fn success_rate(&self) -> Option<f64> {
        if self.total_count == 0 {
            None
        } else {
            Some(self.success_count as f64 / self.total_count as f64)
        }
    }

    /// 1.0 right after use, falling linearly to 0.0 at `RECENCY_WINDOW`.
    pub fn recency(&self, now: u64) -> f64 {
        let Some(last) = self.last_used_at else {
            return 0.0;
        };
        let window = RECENCY_WINDOW.as_millis() as f64;
        let age = now.saturating_sub(last) as f64;
        (1.0 - age / window).clamp(0.0, 1.0)
    }

    /// `None` until the endpoint has been tried at least once.
    pub fn score(&self, now: u64) -> Option<f64> {
        self.success_rate()
            .map(|rate| SUCCESS_WEIGHT * rate + RECENCY_WEIGHT * self.recency(now))
    }
}

/// Per-endpoint view exposed through the stats surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointReport {
    pub endpoint: String,
    #[serde(flatten)]
    pub stats: EndpointStats,
    pub score: Option<f64>,
}

// == Selector ==
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverConfig {
    /// Bound on a single attempt against a single endpoint
    pub attempt_timeout: Duration,
    /// Base delay inserted after a throttled candidate
    pub rate_limit_delay: Duration,
}

impl From<&UpstreamConfig> for FailoverConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            attempt_timeout: config.timeout,
            rate_limit_delay: config.rate_limit_delay,
        }
    }
}

/// Tries base endpoints in adaptive order for each logical call.
///
/// Stats are shared by every request going through this selector.
pub struct EndpointSelector {
    endpoints: Vec<String>,
    stats: Mutex<HashMap<String, EndpointStats>>,
    transport: Arc<dyn HttpTransport>,
    config: FailoverConfig,
}

impl EndpointSelector {
    pub fn new(
        endpoints: Vec<String>,
        transport: Arc<dyn HttpTransport>,
        config: FailoverConfig,
    ) -> Self {
        Self {
            endpoints,
            stats: Mutex::new(HashMap::new()),
            transport,
            config,
        }
    }

    pub fn rank(&self) -> Vec<String> {
        self.rank_at(current_timestamp_ms())
    }

    /// Orders endpoints by score, highest first.
    ///
    /// Endpoints never tried go after every scored one. Ties, including
    /// the all-unseen case, keep configuration order.
    pub fn rank_at(&self, now: u64) -> Vec<String> {
        let stats = self.stats.lock();
        let mut scored: Vec<(usize, Option<f64>)> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, e)| (i, stats.get(e).and_then(|s| s.score(now))))
            .collect();
        drop(stats);

        scored.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => b.total_cmp(a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        scored
            .into_iter()
            .map(|(i, _)| self.endpoints[i].clone())
            .collect()
    }

    pub fn record_outcome(&self, endpoint: &str, success: bool, now: u64) {
        self.stats
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .record(success, now);
    }

    /// Stats and current score for every configured endpoint.
    pub fn snapshot(&self) -> Vec<EndpointReport> {
        let now = current_timestamp_ms();
        let stats = self.stats.lock();
        self.endpoints
            .iter()
            .map(|endpoint| {
                let stats = stats.get(endpoint).cloned().unwrap_or_default();
                EndpointReport {
                    endpoint: endpoint.clone(),
                    score: stats.score(now),
                    stats,
                }
            })
            .collect()
    }

    // == Execute ==
    /// Runs one attempt sequence for `spec`.
    ///
    /// Absolute URLs bypass the endpoint list: one attempt, no stats.
    ///
    /// # Errors
    /// `AllEndpointsFailed` once every candidate has failed.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<UpstreamResponse, UpstreamError> {
        let candidates: Vec<Option<String>> = if spec.is_absolute() {
            vec![None]
        } else {
            self.rank().into_iter().map(Some).collect()
        };

        if candidates.is_empty() {
            return Err(UpstreamError::InvalidRequest(
                "no upstream endpoints configured".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(candidates.len());
        let mut last_status = None;
        let mut rate_limited = false;

        for (index, candidate) in candidates.iter().enumerate() {
            let request = spec.resolve(candidate.as_deref())?;
            let label = candidate.as_deref().unwrap_or(spec.url.as_str());

            let error = match self.attempt(&request).await {
                Ok(response) if response.is_success() => {
                    if let Some(endpoint) = candidate {
                        self.record_outcome(endpoint, true, current_timestamp_ms());
                    }
                    debug!(endpoint = label, status = response.status, "Upstream call succeeded");
                    return Ok(response);
                }
                Ok(response) => response.into_error(),
                Err(error) => error,
            };

            if let Some(endpoint) = candidate {
                self.record_outcome(endpoint, false, current_timestamp_ms());
            }
            warn!(
                endpoint = label,
                candidate = index + 1,
                candidates = candidates.len(),
                error = %error,
                "Endpoint attempt failed"
            );

            let throttled = error.is_rate_limited();
            rate_limited |= throttled;
            if let Some(status) = error.status() {
                last_status = Some(status);
            }
            failures.push(error.to_string());

            if throttled && index + 1 < candidates.len() {
                let delay = self
                    .config
                    .rate_limit_delay
                    .saturating_mul(index as u32 + 1);
                warn!(
                    endpoint = label,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, delaying next endpoint"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(UpstreamError::AllEndpointsFailed {
            failures,
            last_status,
            rate_limited,
        })
    }

    async fn attempt(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                url: request.url.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
