//! Dispatcher (worker pool) configuration

use super::*;
use crate::utils::error::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of workers consuming the request stream
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Longest wait for a rate-limit permit, in milliseconds
    #[serde(default = "default_permit_wait_ms")]
    pub permit_wait_ms: u64,
    /// Maximum output tokens asked of the vendor
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retry configuration
    #[serde(default)]
    pub retry: RetrySettings,
    /// Circuit breaker configuration
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            permit_wait_ms: default_permit_wait_ms(),
            max_tokens: default_max_tokens(),
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn permit_wait(&self) -> Duration {
        Duration::from_millis(self.permit_wait_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Dispatcher workers cannot be 0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens cannot be 0".to_string());
        }
        self.retry.validate()?;
        self.circuit_breaker.validate()
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts, first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay: u64,
    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,
    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Retry max_attempts must be at least 1".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("Retry backoff_multiplier must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("Retry jitter must be between 0.0 and 1.0".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err("Retry base_delay cannot exceed max_delay".to_string());
        }
        Ok(())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay),
            max_delay: Duration::from_millis(settings.max_delay),
            backoff_multiplier: settings.backoff_multiplier,
            jitter: settings.jitter,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Consecutive exhausted requests before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Cool-down window in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("Circuit breaker failure_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        CircuitBreakerConfig {
            failure_threshold: settings.failure_threshold,
            cooldown: Duration::from_secs(settings.cooldown_secs),
        }
    }
}
