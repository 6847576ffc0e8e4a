//! Configuration data models
//!
//! This module defines all configuration structures used throughout the gateway.

#![allow(missing_docs)]

pub mod dispatcher;
pub mod documents;
pub mod gateway;
pub mod logging;
pub mod provider;
pub mod requests;
pub mod server;
pub mod stream;

// Re-export all configuration types
pub use dispatcher::*;
pub use documents::*;
pub use gateway::*;
pub use logging::*;
pub use provider::*;
pub use requests::*;
pub use server::*;
pub use stream::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8000
}

/// Default vendor call timeout in seconds
pub fn default_timeout() -> u64 {
    60
}

/// Default maximum body size in bytes
pub fn default_max_body_size() -> usize {
    20 * 1024 * 1024 // 20MB, uploads are base64
}

pub fn default_rpm() -> u32 {
    60
}

pub fn default_max_connections() -> u32 {
    4
}

pub fn default_workers() -> usize {
    4
}

pub fn default_permit_wait_ms() -> u64 {
    5_000
}

pub fn default_max_tokens() -> u32 {
    1000
}

/// Default maximum attempts, first one included
pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_base_delay() -> u64 {
    200
}

pub fn default_max_delay() -> u64 {
    5000
}

pub fn default_backoff_multiplier() -> f64 {
    2.0
}

pub fn default_jitter() -> f64 {
    0.2
}

pub fn default_failure_threshold() -> u32 {
    1
}

pub fn default_cooldown_secs() -> u64 {
    30
}

pub fn default_lease_ms() -> u64 {
    120_000
}

pub fn default_block_ms() -> u64 {
    1_000
}

pub fn default_await_timeout_secs() -> u64 {
    120
}

pub fn default_retention_ttl_secs() -> u64 {
    600
}

pub fn default_sweep_interval_secs() -> u64 {
    30
}

pub fn default_true() -> bool {
    true
}

pub fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

pub fn default_cors_headers() -> Vec<String> {
    vec!["content-type".to_string(), "accept".to_string()]
}

pub fn default_cors_max_age() -> u32 {
    3600
}
