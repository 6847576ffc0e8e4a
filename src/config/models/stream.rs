//! Request stream configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which message log carries requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackend {
    #[default]
    Memory,
    Redis,
}

/// Request stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub backend: StreamBackend,
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Stream key for requests
    #[serde(default = "default_request_stream")]
    pub request_stream: String,
    /// Consumer group shared by dispatcher workers
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Redelivery lease for unacknowledged messages, in milliseconds
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,
    /// How long a read blocks waiting for messages, in milliseconds
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
    /// Stream key for document select/upload events; unset disables them
    #[serde(default)]
    pub document_events: Option<String>,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_request_stream() -> String {
    "docqa:requests".to_string()
}

fn default_consumer_group() -> String {
    "dispatchers".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backend: StreamBackend::default(),
            redis_url: default_redis_url(),
            request_stream: default_request_stream(),
            consumer_group: default_consumer_group(),
            lease_ms: default_lease_ms(),
            block_ms: default_block_ms(),
            document_events: None,
        }
    }
}

impl StreamConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }

    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.lease_ms == 0 {
            return Err("Stream lease_ms cannot be 0".to_string());
        }
        if self.request_stream.is_empty() || self.consumer_group.is_empty() {
            return Err("Stream and consumer group names are required".to_string());
        }
        if self.document_events.as_deref().is_some_and(str::is_empty) {
            return Err("Stream document_events cannot be empty".to_string());
        }
        if self.backend == StreamBackend::Redis && !self.redis_url.starts_with("redis") {
            return Err(format!("Invalid Redis URL: {}", self.redis_url));
        }
        Ok(())
    }
}
