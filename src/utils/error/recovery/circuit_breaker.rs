//! Circuit breaker implementation for fault tolerance
//!
//! One breaker guards one provider. Only requests that exhausted their
//! transient retries count as failures; while the circuit is open every new
//! request fails fast without touching the network.

use super::types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use crate::utils::error::{GatewayError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Circuit breaker implementation
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    rejected_count: AtomicU64,
    open_count: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
            rejected_count: AtomicU64::new(0),
            open_count: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask permission to call the provider.
    ///
    /// Fails with `ProviderUnavailable` while the circuit is open, or while a
    /// half-open trial call is already in flight.
    pub fn try_acquire(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    debug!(provider = %self.name, "Circuit breaker transitioning from Open to HalfOpen");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    drop(inner);
                    self.reject()
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    drop(inner);
                    self.reject()
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn reject(&self) -> Result<()> {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
        Err(GatewayError::ProviderUnavailable(format!(
            "Circuit breaker is open for provider '{}'",
            self.name
        )))
    }

    /// The provider answered (successfully, or with a permanent error)
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            debug!(provider = %self.name, "Circuit breaker transitioning from HalfOpen to Closed");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    /// A request exhausted its transient retries against the provider
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;

        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if should_open {
            warn!(
                provider = %self.name,
                failures = inner.consecutive_failures,
                cooldown = ?self.config.cooldown,
                "Circuit breaker opening"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            self.open_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Give back an admission that never reached the provider
    pub fn release(&self) {
        self.inner.lock().trial_in_flight = false;
    }

    /// Get current circuit breaker state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get current metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            rejected_count: self.rejected_count.load(Ordering::Relaxed),
            open_count: self.open_count.load(Ordering::Relaxed),
        }
    }
}
