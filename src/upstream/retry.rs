//! Retry executor.
//!
//! Wraps an async operation with bounded retries. Throttling responses
//! (429, quota-exhausted 403) back off exponentially; everything else backs
//! off linearly. Ambiguous 403s get exponential backoff only a limited
//! number of times before the executor gives up.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::UpstreamError;

/// How a failed attempt is treated when scheduling the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 429 or a 403 reporting an exhausted quota
    RateLimited,
    /// 403 without quota information
    Forbidden,
    /// Anything else
    Transient,
}

impl FailureClass {
    pub fn of(error: &UpstreamError) -> Self {
        if error.is_rate_limited() {
            FailureClass::RateLimited
        } else if error.status() == Some(403) {
            FailureClass::Forbidden
        } else {
            FailureClass::Transient
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Exponential `delay * 2^(attempt-1)` for throttling and 403s, linear
    /// `delay * attempt` otherwise. Saturates instead of overflowing.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32, class: FailureClass) -> Duration {
        let attempt = attempt.max(1);
        match class {
            FailureClass::RateLimited | FailureClass::Forbidden => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.config.delay.saturating_mul(factor)
            }
            FailureClass::Transient => self.config.delay.saturating_mul(attempt),
        }
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `context` names the call in logs and in the final error. No delay
    /// follows the last attempt.
    ///
    /// # Errors
    /// `UpstreamError::RetriesExhausted` carrying the last failure message.
    pub async fn execute<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.config.attempts.max(1);
        let mut forbidden_seen: u32 = 0;
        let mut attempts_made: u32 = 0;
        let mut last_message = String::from("no attempt was made");

        for attempt in 1..=max_attempts {
            attempts_made = attempt;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(context, attempt, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = FailureClass::of(&error);
            last_message = error.to_string();

            warn!(
                context,
                attempt,
                max_attempts,
                error = %error,
                "Upstream call failed"
            );

            if class == FailureClass::Forbidden {
                forbidden_seen += 1;
                if forbidden_seen > self.config.forbidden_limit {
                    warn!(context, forbidden_seen, "Giving up on repeated 403 responses");
                    break;
                }
            }

            if attempt == max_attempts {
                break;
            }

            let delay = self.backoff_delay(attempt, class);
            if class == FailureClass::Transient {
                debug!(context, delay_ms = delay.as_millis() as u64, "Retrying");
            } else {
                warn!(
                    context,
                    status = error.status(),
                    delay_ms = delay.as_millis() as u64,
                    "Throttled by upstream, backing off"
                );
            }
            tokio::time::sleep(delay).await;
        }

        Err(UpstreamError::RetriesExhausted {
            context: context.to_string(),
            attempts: attempts_made,
            message: last_message,
        })
    }
}
