//! LLM provider adapters
//!
//! Every vendor is reached through the [`LlmProvider`] capability:
//! `complete(prompt, model, max_tokens, timeout) -> (text, input_tokens, output_tokens)`.
//! Concrete adapters translate that call into the vendor's wire format and
//! back. The [`ProviderRegistry`] resolves a user-facing model choice to the
//! adapter and vendor model that serve it.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod registry;
pub mod shared;
pub mod tokens;
pub mod unified_provider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
pub use registry::{ModelRoute, ProviderRegistry};
pub use unified_provider::ProviderError;

/// Provider type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    #[serde(alias = "google")]
    Gemini,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "xai")]
    XAI,
    /// Any OpenAI-compatible endpoint, e.g. a LiteLLM proxy
    #[serde(rename = "openai_compatible")]
    OpenAICompatible,
}

impl ProviderType {
    /// Stable provider name used in logs, pricing keys and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Gemini => "gemini",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::XAI => "xai",
            ProviderType::OpenAICompatible => "openai_compatible",
        }
    }

    /// Default API base for the vendor
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "https://api.openai.com/v1",
            ProviderType::Anthropic => "https://api.anthropic.com",
            ProviderType::Gemini => "https://generativelanguage.googleapis.com",
            ProviderType::DeepSeek => "https://api.deepseek.com/v1",
            ProviderType::XAI => "https://api.x.ai/v1",
            ProviderType::OpenAICompatible => "http://localhost:4000/v1",
        }
    }

    pub fn all() -> [ProviderType; 6] {
        [
            ProviderType::OpenAI,
            ProviderType::Anthropic,
            ProviderType::Gemini,
            ProviderType::DeepSeek,
            ProviderType::XAI,
            ProviderType::OpenAICompatible,
        ]
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "deepseek" | "deep-seek" => Ok(ProviderType::DeepSeek),
            "xai" => Ok(ProviderType::XAI),
            "openai_compatible" | "openai-compatible" | "litellm" => {
                Ok(ProviderType::OpenAICompatible)
            }
            other => Err(format!("Unknown provider type: {}", other)),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text-completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Vendor model name
    pub model: String,
    pub max_tokens: u32,
    /// Deadline for the whole call, enforced at the adapter boundary
    pub timeout: Duration,
}

/// Where a completion's token counts came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    Vendor,
    Estimated,
}

/// Normalised completion result
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub usage_source: UsageSource,
}

/// Capability shared by every vendor adapter
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Provider name; also the pricing key
    fn name(&self) -> &'static str;

    /// Run one completion
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}

/// Build the adapter for a configured provider
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::OpenAI
        | ProviderType::DeepSeek
        | ProviderType::XAI
        | ProviderType::OpenAICompatible => Arc::new(OpenAIProvider::new(config)?),
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderType::Gemini => Arc::new(GeminiProvider::new(config)?),
    };
    Ok(provider)
}
