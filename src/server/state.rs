//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Instant;

/// HTTP server state shared across handlers
///
/// Every field is behind an `Arc`; cloning the state per worker thread is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway configuration (shared read-only)
    pub config: Arc<Config>,
    /// Request pipeline
    pub orchestrator: Arc<Orchestrator>,
    started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config: Arc::clone(orchestrator.config()),
            orchestrator,
            started_at: Instant::now(),
        }
    }

    /// Get gateway configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
