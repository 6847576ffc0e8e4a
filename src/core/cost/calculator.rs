//! Pricing table and cost calculation
//!
//! `cost = inputTokens/1000 * priceIn + outputTokens/1000 * priceOut`.
//! A missing entry is a configuration gap and is reported as
//! [`CostError::UnknownModel`], never priced at zero.

use std::collections::HashMap;

use super::types::{CostBreakdown, CostError, ModelPricing, UsageTokens};

/// Read-only table of per-(provider, model) prices, built once at startup
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: HashMap<(String, String), ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of prices, rejecting negative or non-finite ones
    pub fn from_entries(
        entries: impl IntoIterator<Item = ModelPricing>,
    ) -> Result<Self, CostError> {
        let mut table = Self::new();
        for pricing in entries {
            table.insert(pricing)?;
        }
        Ok(table)
    }

    /// Add or replace a price entry
    pub fn insert(&mut self, pricing: ModelPricing) -> Result<(), CostError> {
        for (label, price) in [
            ("input", pricing.input_cost_per_1k_tokens),
            ("output", pricing.output_cost_per_1k_tokens),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(CostError::InvalidPricing {
                    model: pricing.model.clone(),
                    message: format!("{} price must be a non-negative number, got {}", label, price),
                });
            }
        }

        self.entries.insert(
            (pricing.provider.clone(), pricing.model.clone()),
            pricing,
        );
        Ok(())
    }

    /// Look up the price pair for a model
    pub fn get(&self, provider: &str, model: &str) -> Result<&ModelPricing, CostError> {
        self.entries
            .get(&(provider.to_string(), model.to_string()))
            .ok_or_else(|| CostError::UnknownModel {
                provider: provider.to_string(),
                model: model.to_string(),
            })
    }

    pub fn contains(&self, provider: &str, model: &str) -> bool {
        self.get(provider, model).is_ok()
    }

    /// Compute the cost of one call
    pub fn cost(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Result<CostBreakdown, CostError> {
        let pricing = self.get(provider, model)?;
        let usage = UsageTokens::new(input_tokens, output_tokens);

        let input_cost = tokens_to_cost(input_tokens, pricing.input_cost_per_1k_tokens);
        let output_cost = tokens_to_cost(output_tokens, pricing.output_cost_per_1k_tokens);

        Ok(CostBreakdown {
            total_cost: input_cost + output_cost,
            input_cost,
            output_cost,
            usage,
            currency: pricing.currency.clone(),
            model: model.to_string(),
            provider: provider.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelPricing> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Convert a token count to cost given a per-1K price
pub fn tokens_to_cost(tokens: u32, cost_per_1k: f64) -> f64 {
    // Multiply first so whole-token prices stay exact
    (tokens as f64 * cost_per_1k) / 1000.0
}
