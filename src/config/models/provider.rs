//! Provider and model configuration

use super::*;
use crate::core::providers::ProviderType;
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type (openai, anthropic, gemini, ...); also its name
    pub provider_type: ProviderType,
    /// API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL
    pub base_url: Option<String>,
    /// API version (Anthropic)
    pub api_version: Option<String>,
    /// Organization ID (OpenAI)
    pub organization: Option<String>,
    /// Call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Maximum requests per minute
    #[serde(default = "default_rpm")]
    pub rpm: u32,
    /// Maximum concurrent requests
    #[serde(default = "default_max_connections")]
    pub max_concurrent_requests: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: None,
            base_url: None,
            api_version: None,
            organization: None,
            timeout: default_timeout(),
            rpm: default_rpm(),
            max_concurrent_requests: default_max_connections(),
        }
    }
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType, api_key: Option<String>) -> Self {
        Self {
            provider_type,
            api_key,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &'static str {
        self.provider_type.as_str()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err(format!("Timeout cannot be 0 for provider: {}", self.name()));
        }
        if self.rpm == 0 {
            return Err(format!("RPM cannot be 0 for provider: {}", self.name()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(format!(
                "Max concurrent requests cannot be 0 for provider: {}",
                self.name()
            ));
        }
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!(
                    "Base URL for provider {} must use http:// or https://",
                    self.name()
                ));
            }
        }
        Ok(())
    }
}

/// A user-facing model choice and the vendor model serving it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name callers pass as `modelChoice`
    pub choice: String,
    /// Provider serving the model
    pub provider: ProviderType,
    /// Vendor model name
    pub model: String,
    /// Input cost per 1K tokens
    pub input_cost_per_1k_tokens: Option<f64>,
    /// Output cost per 1K tokens
    pub output_cost_per_1k_tokens: Option<f64>,
}

impl ModelConfig {
    pub fn new(
        choice: impl Into<String>,
        provider: ProviderType,
        model: impl Into<String>,
        input_cost_per_1k_tokens: f64,
        output_cost_per_1k_tokens: f64,
    ) -> Self {
        Self {
            choice: choice.into(),
            provider,
            model: model.into(),
            input_cost_per_1k_tokens: Some(input_cost_per_1k_tokens),
            output_cost_per_1k_tokens: Some(output_cost_per_1k_tokens),
        }
    }

    /// Both prices, if configured
    pub fn prices(&self) -> Option<(f64, f64)> {
        Some((self.input_cost_per_1k_tokens?, self.output_cost_per_1k_tokens?))
    }
}

/// Built-in catalogue of the five document Q&A models.
///
/// With `via` set, every model is served by that provider (a LiteLLM-style
/// proxy) under the same vendor model names.
pub fn default_model_catalogue(via: Option<ProviderType>) -> Vec<ModelConfig> {
    let entries = [
        ("GPT-4o", ProviderType::OpenAI, "gpt-4o", 0.01, 0.03),
        ("Gemini-Flash", ProviderType::Gemini, "gemini-1.5-flash", 0.0035, 0.0035),
        ("DeepSeek", ProviderType::DeepSeek, "deepseek-coder", 0.0009, 0.0009),
        ("Claude", ProviderType::Anthropic, "claude-3-sonnet-20240229", 0.008, 0.024),
        ("Grok", ProviderType::XAI, "grok-1", 0.005, 0.015),
    ];

    entries
        .into_iter()
        .map(|(choice, provider, model, input, output)| {
            ModelConfig::new(choice, via.unwrap_or(provider), model, input, output)
        })
        .collect()
}
