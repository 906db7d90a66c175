//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.
//! Every value is handed to constructors explicitly; nothing reads the
//! environment after startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Public GitHub REST endpoint used when no endpoints are configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub retry: RetryConfig,
}

/// TTL store settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Lifetime of entries written without an explicit TTL
    pub default_ttl: Duration,
    /// Entry count the sweep trims back to
    pub max_entries: usize,
    /// How often the background sweep runs
    pub cleanup_interval: Duration,
}

/// Upstream endpoints and per-attempt settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Base endpoints in priority order, e.g. a proxy then the public API
    pub endpoints: Vec<String>,
    /// Bearer token, only sent when non-empty
    pub token: Option<String>,
    pub user_agent: String,
    /// Timeout for a single attempt against a single endpoint
    pub timeout: Duration,
    /// Base delay between failover candidates after a 429
    pub rate_limit_delay: Duration,
}

/// Retry executor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total tries, including the first
    pub attempts: u32,
    /// Base delay for linear and exponential backoff
    pub delay: Duration,
    /// How many ambiguous 403 responses are retried before giving up
    pub forbidden_limit: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL_MS` - Default entry TTL (default: 300000)
    /// - `CACHE_MAX_ENTRIES` - Size bound (default: 500)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep frequency (default: 60000)
    /// - `UPSTREAM_ENDPOINTS` - Comma-separated base URLs (default: https://api.github.com)
    /// - `GITHUB_TOKEN` - Bearer token (default: none)
    /// - `UPSTREAM_USER_AGENT` - User-Agent header (default: upstream-cache)
    /// - `UPSTREAM_TIMEOUT_MS` - Per-attempt timeout (default: 15000)
    /// - `RATE_LIMIT_DELAY_MS` - Failover delay base after a 429 (default: 1000)
    /// - `RETRY_ATTEMPTS` - Tries per request (default: 5)
    /// - `RETRY_DELAY_MS` - Backoff base (default: 2000)
    /// - `RETRY_FORBIDDEN_LIMIT` - Retries allowed for plain 403s (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache: CacheConfig {
                default_ttl: millis_var("CACHE_TTL_MS").unwrap_or(defaults.cache.default_ttl),
                max_entries: parse_var("CACHE_MAX_ENTRIES")
                    .unwrap_or(defaults.cache.max_entries),
                cleanup_interval: millis_var("CACHE_CLEANUP_INTERVAL_MS")
                    .filter(|d| !d.is_zero())
                    .unwrap_or(defaults.cache.cleanup_interval),
            },
            upstream: UpstreamConfig {
                endpoints: env::var("UPSTREAM_ENDPOINTS")
                    .ok()
                    .map(|v| parse_endpoints(&v))
                    .filter(|e| !e.is_empty())
                    .unwrap_or(defaults.upstream.endpoints),
                token: env::var("GITHUB_TOKEN")
                    .ok()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                user_agent: env::var("UPSTREAM_USER_AGENT")
                    .unwrap_or(defaults.upstream.user_agent),
                timeout: millis_var("UPSTREAM_TIMEOUT_MS").unwrap_or(defaults.upstream.timeout),
                rate_limit_delay: millis_var("RATE_LIMIT_DELAY_MS")
                    .unwrap_or(defaults.upstream.rate_limit_delay),
            },
            retry: RetryConfig {
                attempts: parse_var("RETRY_ATTEMPTS")
                    .filter(|n: &u32| *n > 0)
                    .unwrap_or(defaults.retry.attempts),
                delay: millis_var("RETRY_DELAY_MS").unwrap_or(defaults.retry.delay),
                forbidden_limit: parse_var("RETRY_FORBIDDEN_LIMIT")
                    .unwrap_or(defaults.retry.forbidden_limit),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_entries: 500,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            token: None,
            user_agent: "upstream-cache".to_string(),
            timeout: Duration::from_secs(15),
            rate_limit_delay: Duration::from_secs(1),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
            forbidden_limit: 1,
        }
    }
}

/// Splits a comma-separated endpoint list, dropping blanks and trailing slashes.
pub fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_end_matches('/'))
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn millis_var(name: &str) -> Option<Duration> {
    parse_var::<u64>(name).map(Duration::from_millis)
}
