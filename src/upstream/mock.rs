//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::UpstreamError;

use super::request::UpstreamRequest;
use super::transport::{HttpTransport, UpstreamResponse};

#[derive(Debug, Clone)]
pub enum MockReply {
    Json(u16, Value),
    Text(u16, &'static str),
    /// 429 Too Many Requests
    RateLimited,
    /// 403 with `x-ratelimit-remaining: 0`
    QuotaExhausted,
    NetworkError,
    /// Never answers within any sane timeout
    Hang,
}

/// Replies are matched by URL prefix and consumed in order. When a
/// script runs dry the fallback reply is used, or a network error.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<Vec<(String, VecDeque<MockReply>)>>,
    fallback: Option<MockReply>,
    latency: Duration,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, prefix: &str, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.scripts
            .lock()
            .push((prefix.to_string(), replies.into_iter().collect()));
        self
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }

    fn next_reply(&self, url: &str) -> MockReply {
        let mut scripts = self.scripts.lock();
        scripts
            .iter_mut()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .find_map(|(_, queue)| queue.pop_front())
            .or_else(|| self.fallback.clone())
            .unwrap_or(MockReply::NetworkError)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        self.requests.lock().push(request.clone());
        let reply = self.next_reply(&request.url);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = |status: u16,
                        content_type: &str,
                        body: String,
                        remaining: Option<u64>|
         -> Result<UpstreamResponse, UpstreamError> {
            Ok(UpstreamResponse {
                url: request.url.clone(),
                status,
                content_type: Some(content_type.to_string()),
                rate_limit_remaining: remaining,
                body,
            })
        };

        match reply {
            MockReply::Json(status, value) => {
                response(status, "application/json", value.to_string(), None)
            }
            MockReply::Text(status, body) => response(status, "text/plain", body.to_string(), None),
            MockReply::RateLimited => response(
                429,
                "application/json",
                r#"{"message":"secondary rate limit"}"#.to_string(),
                None,
            ),
            MockReply::QuotaExhausted => response(
                403,
                "application/json",
                r#"{"message":"API rate limit exceeded"}"#.to_string(),
                Some(0),
            ),
            MockReply::NetworkError => Err(UpstreamError::Network {
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
            MockReply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(UpstreamError::Network {
                    url: request.url.clone(),
                    message: "hung request released".to_string(),
                })
            }
        }
    }
}
