//! Configuration management for the Gateway
//!
//! This module handles loading and validation of all gateway configuration.
//! Configuration is loaded once at startup and is read-only afterwards.

pub mod models;

pub use models::*;

use crate::utils::error::{GatewayError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the Gateway
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Gateway configuration
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml(&content)?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut gateway: GatewayConfig = serde_yaml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;
        gateway.apply_env_api_keys();

        let config = Self { gateway };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let gateway = GatewayConfig::from_env()?;
        let config = Self { gateway };

        config.validate()?;
        Ok(config)
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.gateway.server
    }

    /// Get providers configuration
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.gateway.providers
    }

    /// Get model catalogue
    pub fn models(&self) -> &[ModelConfig] {
        &self.gateway.models
    }

    pub fn dispatcher(&self) -> &DispatcherConfig {
        &self.gateway.dispatcher
    }

    pub fn stream(&self) -> &StreamConfig {
        &self.gateway.stream
    }

    pub fn requests(&self) -> &RequestsConfig {
        &self.gateway.requests
    }

    pub fn documents(&self) -> &DocumentsConfig {
        &self.gateway.documents
    }

    pub fn ledger(&self) -> &LedgerConfig {
        &self.gateway.ledger
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.gateway.logging
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");
        self.gateway.validate().map_err(GatewayError::Config)?;
        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string (API keys omitted)
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.gateway)
            .map_err(|e| GatewayError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
