//! Main gateway configuration

#![allow(missing_docs)]

use super::*;
use crate::core::providers::ProviderType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::utils::error::{GatewayError, Result};

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Provider configurations
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Model choices, their routes and prices
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    /// Worker pool configuration
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Request stream configuration
    #[serde(default)]
    pub stream: StreamConfig,
    /// Await, response mode and retention
    #[serde(default)]
    pub requests: RequestsConfig,
    /// Document storage
    #[serde(default)]
    pub documents: DocumentsConfig,
    /// Usage ledger
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vendor key variables read by [`GatewayConfig::from_env`]
const PROVIDER_KEY_VARS: [(ProviderType, &str); 5] = [
    (ProviderType::OpenAI, "OPENAI_API_KEY"),
    (ProviderType::Gemini, "GOOGLE_API_KEY"),
    (ProviderType::Anthropic, "ANTHROPIC_API_KEY"),
    (ProviderType::DeepSeek, "DEEPSEEK_API_KEY"),
    (ProviderType::XAI, "XAI_API_KEY"),
];

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_var(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| GatewayError::Config(format!("Invalid value for {}: {}", key, value))),
        None => Ok(None),
    }
}

impl GatewayConfig {
    /// Build the configuration from environment variables.
    ///
    /// With `LITELLM_API_URL` set, every model is routed through that
    /// OpenAI-compatible proxy; otherwise each vendor is called directly
    /// with its own key.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = env_var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            config.server.port = port;
        }

        if let Some(proxy_url) = env_var("LITELLM_API_URL") {
            config.providers.push(ProviderConfig {
                provider_type: ProviderType::OpenAICompatible,
                api_key: env_var("LITELLM_API_KEY"),
                base_url: Some(proxy_url),
                ..ProviderConfig::default()
            });
            config.models = default_model_catalogue(Some(ProviderType::OpenAICompatible));
        } else {
            for (provider_type, key_var) in PROVIDER_KEY_VARS {
                config
                    .providers
                    .push(ProviderConfig::new(provider_type, env_var(key_var)));
            }
            config.models = default_model_catalogue(None);
        }

        if let Some(url) = env_var("REDIS_URL") {
            config.stream.backend = StreamBackend::Redis;
            config.stream.redis_url = url;
        } else if let Some(host) = env_var("REDIS_HOST") {
            let port: u16 = env_parse("REDIS_PORT")?.unwrap_or(6379);
            let db: u32 = env_parse("REDIS_DB")?.unwrap_or(0);
            let auth = env_var("REDIS_PASSWORD")
                .map(|password| format!(":{}@", password))
                .unwrap_or_default();
            config.stream.backend = StreamBackend::Redis;
            config.stream.redis_url = format!("redis://{}{}:{}/{}", auth, host, port, db);
        }

        if let Some(workers) = env_parse("DISPATCHER_WORKERS")? {
            config.dispatcher.workers = workers;
        }
        if let Some(dir) = env_var("COST_LOG_DIR") {
            config.ledger.enabled = true;
            config.ledger.dir = dir;
        }
        if let Some(dir) = env_var("PDF_STORAGE_DIR") {
            config.documents.storage_dir = Some(dir);
        }
        if let Some(format) = env_var("LOG_FORMAT") {
            config.logging.format = format.parse().map_err(GatewayError::Config)?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.server.validate()?;

        let mut provider_types = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !provider_types.insert(provider.provider_type) {
                return Err(format!("Duplicate provider: {}", provider.name()));
            }
            if provider.api_key.is_none() && provider.provider_type != ProviderType::OpenAICompatible
            {
                warn!(provider = provider.name(), "No API key configured");
            }
        }

        if self.models.is_empty() {
            return Err("At least one model must be configured".to_string());
        }

        let mut choices = HashSet::new();
        for model in &self.models {
            if model.choice.trim().is_empty() || model.model.trim().is_empty() {
                return Err("Model choice and vendor model name are required".to_string());
            }
            if !choices.insert(model.choice.as_str()) {
                return Err(format!("Duplicate model choice: {}", model.choice));
            }
            if !provider_types.contains(&model.provider) {
                return Err(format!(
                    "Model '{}' routes to unconfigured provider '{}'",
                    model.choice, model.provider
                ));
            }
            match model.prices() {
                Some((input, output)) if input < 0.0 || output < 0.0 => {
                    return Err(format!("Negative price for model '{}'", model.choice));
                }
                Some(_) => {}
                // Operator-visible gap; requests for it fail with UnknownModel
                None => warn!(model = %model.choice, "Model has no price entry"),
            }
        }

        self.dispatcher.validate()?;
        self.stream.validate()?;
        self.requests.validate()?;

        let longest_call = self
            .providers
            .iter()
            .map(|p| p.timeout)
            .max()
            .unwrap_or(0)
            .saturating_mul(1000)
            .saturating_mul(u64::from(self.dispatcher.retry.max_attempts));
        if self.stream.lease_ms < longest_call {
            warn!(
                lease_ms = self.stream.lease_ms,
                longest_call_ms = longest_call,
                "Stream lease is shorter than the longest retried provider call; slow requests may be redelivered"
            );
        }

        Ok(())
    }

    /// Fill providers without an `api_key` from the vendor's key variable
    pub fn apply_env_api_keys(&mut self) {
        for provider in &mut self.providers {
            if provider.api_key.is_some() {
                continue;
            }
            let key_var = match provider.provider_type {
                ProviderType::OpenAICompatible => Some("LITELLM_API_KEY"),
                other => PROVIDER_KEY_VARS
                    .iter()
                    .find(|(provider_type, _)| *provider_type == other)
                    .map(|(_, var)| *var),
            };
            provider.api_key = key_var.and_then(env_var);
        }
    }

    /// Get provider by type
    pub fn get_provider(&self, provider_type: ProviderType) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.provider_type == provider_type)
    }
}
