//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::create_cache_key;
use crate::upstream::RequestSpec;

/// Longest cache key accepted over HTTP.
pub const MAX_KEY_LEN: usize = 256;

/// Body for `POST /request` and `POST /warmup`.
///
/// The cache key is either given explicitly or derived from `prefix` and
/// `params`, so callers that describe the same resource with the same
/// parameters share one entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CachedRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    pub request: RequestSpec,
}

impl CachedRequest {
    /// Resolves the cache key: the explicit key wins over prefix + params.
    pub fn cache_key(&self) -> Option<String> {
        if let Some(key) = self.key.as_deref().filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        let prefix = self.prefix.as_deref().filter(|p| !p.is_empty())?;
        let params = self.params.iter().map(|(k, v)| (k, param_text(v)));
        Some(create_cache_key(prefix, params))
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let Some(key) = self.cache_key() else {
            return Some("Either 'key' or 'prefix' is required".to_string());
        };
        if key.len() > MAX_KEY_LEN {
            return Some(format!(
                "Key exceeds maximum length of {MAX_KEY_LEN} characters"
            ));
        }
        if self.request.url.trim().is_empty() {
            return Some("Request url cannot be empty".to_string());
        }
        None
    }
}

/// Query strings keep strings unquoted; other JSON values use their JSON text.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
