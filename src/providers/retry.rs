//! Retry configuration and delay calculation.
//!
//! Backoff depends on the failure class: rate limiting waits the longest,
//! refused connections a medium interval, everything else a short one.
//! Each class grows geometrically with the attempt number. Attempts within
//! one logical call are strictly sequential.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FailureClass, InferenceFailure};
use crate::telemetry;

/// Configuration for retry behaviour on backend failures.
///
/// ```rust
/// # use skald::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// First delay for ordinary failures. Default: 1s.
    #[serde(with = "millis", rename = "base_delay_ms")]
    pub base_delay: Duration,
    /// First delay after a refused connection. Default: 5s.
    #[serde(with = "millis", rename = "connection_refused_delay_ms")]
    pub connection_refused_delay: Duration,
    /// First delay after a rate-limit response. Default: 30s.
    #[serde(with = "millis", rename = "rate_limited_delay_ms")]
    pub rate_limited_delay: Duration,
    /// Cap on any single computed delay. Default: 120s.
    #[serde(with = "millis", rename = "max_delay_ms")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            connection_refused_delay: Duration::from_secs(5),
            rate_limited_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the first delay for ordinary failures.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the first delay after a refused connection.
    pub fn connection_refused_delay(mut self, delay: Duration) -> Self {
        self.connection_refused_delay = delay;
        self
    }

    /// Set the first delay after a rate-limit response.
    pub fn rate_limited_delay(mut self, delay: Duration) -> Self {
        self.rate_limited_delay = delay;
        self
    }

    /// Set the cap on computed delays.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Effective attempt budget; never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after a failure of `class` on the given attempt (0-indexed).
    ///
    /// `class_base * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, class: FailureClass, attempt: u32) -> Duration {
        let base = match class {
            FailureClass::RateLimited => self.rate_limited_delay,
            FailureClass::ConnectionRefused => self.connection_refused_delay,
            FailureClass::Other => self.base_delay,
        };
        base.saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Delay after `failure`, preferring a server `Retry-After` hint.
    pub fn effective_delay(&self, failure: &InferenceFailure, attempt: u32) -> Duration {
        failure
            .retry_after()
            .unwrap_or_else(|| self.delay_for_attempt(failure.class(), attempt))
    }
}

/// Run `f` until it succeeds or the attempt budget is spent.
///
/// Returns the value and the number of attempts used, or the last failure
/// and the number of attempts used.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    model: &str,
    f: F,
) -> Result<(T, u32), (InferenceFailure, u32)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, InferenceFailure>>,
{
    let max_attempts = config.attempts();
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(failure) => {
                if attempt + 1 >= max_attempts {
                    return Err((failure, attempt + 1));
                }
                let delay = config.effective_delay(&failure, attempt);
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "model" => model.to_owned(),
                    "class" => class_label(failure.class()),
                )
                .increment(1);
                warn!(
                    model,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "retrying after backend failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn class_label(class: FailureClass) -> &'static str {
    match class {
        FailureClass::RateLimited => "rate_limited",
        FailureClass::ConnectionRefused => "connection_refused",
        FailureClass::Other => "other",
    }
}

/// Serde adapter storing durations as integer milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
