//! Retry with exponential backoff for BigKinds requests

use super::BigKindsError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    #[inline]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    #[inline]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or attempts run out
#[inline]
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, BigKindsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BigKindsError>>,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let last = attempt + 1 >= attempts;
                if !e.is_retryable() || last {
                    if e.is_retryable() {
                        error!(
                            operation,
                            attempts,
                            error = %e,
                            "All attempts failed"
                        );
                    }
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after error"
                );
                sleep(delay).await;
            }
        }
    }

    Err(BigKindsError::RetriesExhausted(operation.to_string()))
}
