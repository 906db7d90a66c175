//! Request descriptions.
//!
//! A `RequestSpec` describes one logical call independently of which base
//! endpoint ends up serving it. Relative URLs are resolved against each
//! failover candidate; absolute URLs are sent as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::UpstreamError;

/// Methods the orchestrator issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical HTTP call plus its caching options.
///
/// Immutable once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Path relative to the upstream endpoints, or an absolute URL
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON body; a JSON string is sent as plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Overrides the store's default TTL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_ms: Option<u64>,
    /// Ignore any fresh entry and go upstream (the result is still cached)
    #[serde(default)]
    pub skip_cache: bool,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
            cache_ttl_ms: None,
            skip_cache: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Marks the request to bypass fresh cache entries.
    pub fn bypass_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }

    /// True for `http://` and `https://` URLs.
    pub fn is_absolute(&self) -> bool {
        Url::parse(&self.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), UpstreamError> {
        if self.url.trim().is_empty() {
            return Err(UpstreamError::InvalidRequest("url cannot be empty".to_string()));
        }
        Ok(())
    }

    // == Resolve ==
    /// Builds the concrete request for one candidate endpoint.
    ///
    /// `base` is ignored for absolute URLs and required otherwise.
    pub fn resolve(&self, base: Option<&str>) -> Result<UpstreamRequest, UpstreamError> {
        self.validate()?;

        let url = if self.is_absolute() {
            self.url.clone()
        } else {
            let base = base.ok_or_else(|| {
                UpstreamError::InvalidRequest(format!(
                    "relative url '{}' needs an upstream endpoint",
                    self.url
                ))
            })?;
            join_url(base, &self.url)
        };

        let mut headers: Vec<(String, String)> = Vec::with_capacity(self.headers.len() + 1);
        if !self
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"))
        {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = match (&self.body, self.method) {
            (_, HttpMethod::Get) | (None, _) => None,
            (Some(Value::String(text)), _) => Some(RequestBody::Text(text.clone())),
            (Some(value), _) => Some(RequestBody::Json(value.clone())),
        };

        Ok(UpstreamRequest {
            url,
            method: self.method,
            headers,
            body,
        })
    }
}

/// Body of a resolved request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

/// A request bound to a concrete URL, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
