//! Retry with exponential backoff for remote queries.
//!
//! Transient failures (transport errors, timeouts, 5xx) are retried up to
//! three times with doubling, jittered delays. A 429 pushback is honored by
//! sleeping for the server-indicated delay (5 s fallback) without consuming
//! an attempt. Other 4xx fail the query permanently for the session.

use crate::config::NetworkConfig;
use crate::error::{Result, StacksError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: NetworkConfig::MAX_RETRIES,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-indexed), doubled each time
    /// and capped, with optional 0.5–1.5x jitter.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let doubled = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = doubled.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            (capped * factor).min(self.max_delay.as_secs_f64())
        } else {
            capped
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Run `operation` with the retry and pushback policy above.
pub async fn retry_async<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return Ok(value);
            }
            Err(StacksError::RateLimited {
                service,
                retry_after_secs,
            }) => {
                // Pushback does not consume an attempt.
                let delay = retry_after_secs
                    .map(Duration::from_secs)
                    .unwrap_or(NetworkConfig::RATE_LIMIT_FALLBACK);
                warn!(
                    target: "request",
                    service, delay_secs = delay.as_secs(),
                    "Rate limited, honoring pushback"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_retryable() => {
                attempt += 1;
                if attempt >= config.max_attempts {
                    warn!("All {} attempts exhausted: {}", config.max_attempts, e);
                    return Err(e);
                }
                let delay = config.calculate_delay(attempt - 1);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, config.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!("Error is not retryable: {}", e);
                return Err(e);
            }
        }
    }
}
