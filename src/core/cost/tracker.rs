//! Running cost totals per provider
//!
//! Observability only; not a billing source of truth.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::types::{CostBreakdown, CostSummary, ProviderTotals};

/// Thread-safe accumulator shared by every dispatcher worker
#[derive(Debug, Default)]
pub struct CostTracker {
    providers: RwLock<HashMap<String, ProviderTotals>>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add cost for a successful request
    pub fn add_request_cost(&self, breakdown: &CostBreakdown) {
        let mut providers = self.providers.write();
        let totals = providers.entry(breakdown.provider.clone()).or_default();
        totals.requests += 1;
        totals.input_tokens += u64::from(breakdown.usage.prompt_tokens);
        totals.output_tokens += u64::from(breakdown.usage.completion_tokens);
        totals.total_cost += breakdown.total_cost;
    }

    /// Get cost by provider
    pub fn cost_by_provider(&self, provider: &str) -> f64 {
        self.providers
            .read()
            .get(provider)
            .map(|t| t.total_cost)
            .unwrap_or(0.0)
    }

    /// Get cost summary
    pub fn summary(&self) -> CostSummary {
        let providers = self.providers.read().clone();
        CostSummary {
            total_cost: providers.values().map(|t| t.total_cost).sum(),
            total_requests: providers.values().map(|t| t.requests).sum(),
            providers,
            currency: "USD".to_string(),
        }
    }
}
