//! HTTP transport seam.
//!
//! `HttpTransport` is the only place bytes leave the process. Production
//! uses `ReqwestTransport`; tests substitute a scripted implementation.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde_json::Value;
use tracing::debug;
use url::{Origin, Url};

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

use super::request::{RequestBody, UpstreamRequest};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Longest body excerpt carried into error messages.
const MESSAGE_EXCERPT_LEN: usize = 200;

/// Raw upstream answer, before any success check.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Value of `x-ratelimit-remaining`, when the upstream reports it
    pub rate_limit_remaining: Option<u64>,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 429, or a 403 that reports an exhausted quota.
    ///
    /// A bare 403 is ambiguous (permissions vs. secondary limits) and is
    /// left to the retry policy.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429 || (self.status == 403 && self.rate_limit_remaining == Some(0))
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    /// Converts a non-2xx response into a status error.
    pub fn into_error(self) -> UpstreamError {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status");

        let excerpt: String = self.body.trim().chars().take(MESSAGE_EXCERPT_LEN).collect();
        let message = if excerpt.is_empty() {
            reason.to_string()
        } else {
            format!("{reason}: {excerpt}")
        };

        UpstreamError::Status {
            rate_limited: self.is_rate_limited(),
            url: self.url,
            status: self.status,
            message,
        }
    }

    /// Decodes the body: JSON for JSON content types, a string otherwise.
    pub fn into_payload(self) -> Result<Value, UpstreamError> {
        if !self.is_json() {
            return Ok(Value::String(self.body));
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| UpstreamError::Decode {
            url: self.url,
            message: e.to_string(),
        })
    }
}

// == Transport Trait ==
/// Executes one resolved request against the network.
///
/// Implementations return `Ok` for every HTTP answer, whatever its status;
/// `Err` is reserved for failures where no response arrived.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

// == Reqwest Transport ==
/// `reqwest`-backed transport.
///
/// The GitHub identity headers, token included, only go to the configured
/// endpoints. Any other origin gets a bare request with the User-Agent.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    identity: HeaderMap,
    trusted_origins: Vec<Origin>,
}

impl ReqwestTransport {
    /// Builds a client with the configured identity and optional token.
    ///
    /// The Authorization header is only attached when a token is present.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut identity = HeaderMap::new();

        identity.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        identity.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| UpstreamError::InvalidRequest(format!("token: {e}")))?;
            value.set_sensitive(true);
            identity.insert(AUTHORIZATION, value);
        }

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| UpstreamError::InvalidRequest(format!("user agent: {e}")))?;
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| UpstreamError::InvalidRequest(format!("http client: {e}")))?;

        let trusted_origins = config
            .endpoints
            .iter()
            .filter_map(|endpoint| Url::parse(endpoint).ok())
            .map(|url| url.origin())
            .collect();

        Ok(Self {
            client,
            identity,
            trusted_origins,
        })
    }

    /// True when `url` points at one of the configured endpoints.
    pub fn is_trusted(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|url| self.trusted_origins.contains(&url.origin()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), &request.url);

        if self.is_trusted(&request.url) {
            builder = builder.headers(self.identity.clone());
        } else {
            debug!(url = %request.url, "Untrusted origin, sending without identity headers");
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                UpstreamError::InvalidRequest(e.to_string())
            } else {
                UpstreamError::Network {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let rate_limit_remaining = response
            .headers()
            .get(RATE_LIMIT_REMAINING)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let body = response.text().await.map_err(|e| UpstreamError::Network {
            url: request.url.clone(),
            message: format!("reading body: {e}"),
        })?;

        Ok(UpstreamResponse {
            url: request.url.clone(),
            status,
            content_type,
            rate_limit_remaining,
            body,
        })
    }
}
