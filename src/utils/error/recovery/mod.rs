//! Error recovery and resilience utilities
//!
//! Retry with backoff and per-provider circuit breakers.

mod circuit_breaker;
mod retry;
mod types;

pub use circuit_breaker::CircuitBreaker;
pub use retry::{RetryOutcome, RetryPolicy};
pub use types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState, RetryConfig};
