//! Request handling configuration: await deadline, response mode, retention

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the HTTP surface answers summarize/ask calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Block until the Response arrives (or the await deadline passes)
    #[default]
    Sync,
    /// Return the request id immediately
    Async,
}

/// Request handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsConfig {
    /// Deadline for a synchronous await, in seconds
    #[serde(default = "default_await_timeout_secs")]
    pub await_timeout_secs: u64,
    /// Mode used when the caller does not pick one
    #[serde(default)]
    pub default_mode: ResponseMode,
    /// How long terminal records are kept, in seconds
    #[serde(default = "default_retention_ttl_secs")]
    pub retention_ttl_secs: u64,
    /// How often expired records are swept, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            await_timeout_secs: default_await_timeout_secs(),
            default_mode: ResponseMode::default(),
            retention_ttl_secs: default_retention_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RequestsConfig {
    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout_secs)
    }

    pub fn retention_ttl(&self) -> Duration {
        Duration::from_secs(self.retention_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.await_timeout_secs == 0 {
            return Err("await_timeout_secs cannot be 0".to_string());
        }
        if self.retention_ttl_secs == 0 {
            return Err("retention_ttl_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Usage ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding `cost_log_YYYY-MM-DD.jsonl` files
    #[serde(default = "default_ledger_dir")]
    pub dir: String,
}

fn default_ledger_dir() -> String {
    "./cost_logs".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_ledger_dir(),
        }
    }
}
