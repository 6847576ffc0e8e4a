//! Retry mechanism with exponential backoff

use super::types::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a retried operation together with the number of attempts made
#[derive(Debug)]
pub struct RetryOutcome<R, E> {
    /// Final result (the last error when every attempt failed)
    pub result: Result<R, E>,
    /// Attempts made, including the first one
    pub attempts: u32,
}

impl<R, E> RetryOutcome<R, E> {
    /// Number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry mechanism with exponential backoff and jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute `f`, retrying while `should_retry` classifies the error as
    /// transient and attempts remain.
    pub async fn call<F, Fut, R, E, C>(&self, mut f: F, should_retry: C) -> RetryOutcome<R, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: std::fmt::Display,
        C: Fn(&E) -> bool,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match f(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Retry succeeded on attempt {}", attempt);
                    }
                    return RetryOutcome {
                        result: Ok(result),
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    if !should_retry(&error) {
                        debug!("Attempt {} failed permanently: {}", attempt, error);
                        return RetryOutcome {
                            result: Err(error),
                            attempts: attempt,
                        };
                    }
                    if attempt >= max_attempts {
                        warn!("Retry failed after {} attempts: {}", attempt, error);
                        return RetryOutcome {
                            result: Err(error),
                            attempts: attempt,
                        };
                    }

                    let delay = self.delay_for(attempt);
                    debug!(
                        "Attempt {} failed: {}, retrying in {:?}",
                        attempt, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Backoff delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.config.base_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(exponent);
        let capped = base.min(self.config.max_delay.as_millis() as f64);

        let jitter_factor = self.config.jitter.clamp(0.0, 1.0);
        let jittered = if jitter_factor > 0.0 {
            let jitter = capped * jitter_factor * (rand::random::<f64>() * 2.0 - 1.0);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(jittered as u64)
    }
}
