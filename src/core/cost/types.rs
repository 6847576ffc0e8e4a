//! Cost calculation types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Token usage reported for one completed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTokens {
    /// Input/prompt tokens
    pub prompt_tokens: u32,
    /// Output/completion tokens
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    pub total_tokens: u32,
}

impl UsageTokens {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Price pair for one (provider, model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Provider name
    pub provider: String,
    /// Vendor model name
    pub model: String,
    /// Input cost per 1K tokens
    pub input_cost_per_1k_tokens: f64,
    /// Output cost per 1K tokens
    pub output_cost_per_1k_tokens: f64,
    /// Currency (usually "USD")
    pub currency: String,
}

impl ModelPricing {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        input_cost_per_1k_tokens: f64,
        output_cost_per_1k_tokens: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            input_cost_per_1k_tokens,
            output_cost_per_1k_tokens,
            currency: "USD".to_string(),
        }
    }
}

/// Detailed cost breakdown after completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Total cost
    pub total_cost: f64,
    /// Input/prompt cost
    pub input_cost: f64,
    /// Output/completion cost
    pub output_cost: f64,
    /// Token usage breakdown
    pub usage: UsageTokens,
    /// Currency
    pub currency: String,
    /// Model used
    pub model: String,
    /// Provider used
    pub provider: String,
}

/// Running totals for a single provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTotals {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

/// Snapshot of every provider's running totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    /// Total cost across all providers
    pub total_cost: f64,
    /// Total number of successful requests
    pub total_requests: u64,
    /// Totals keyed by provider name
    pub providers: HashMap<String, ProviderTotals>,
    /// Currency
    pub currency: String,
}

/// Cost calculation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CostError {
    #[error("No price entry for model '{model}' of provider '{provider}'")]
    UnknownModel { provider: String, model: String },

    #[error("Invalid pricing for model '{model}': {message}")]
    InvalidPricing { model: String, message: String },
}
