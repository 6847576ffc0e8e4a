//! Cost accounting
//!
//! Static pricing table, per-call cost calculation, running totals per
//! provider and an optional daily usage ledger.

pub mod calculator;
pub mod ledger;
pub mod tracker;
pub mod types;

pub use calculator::{PricingTable, tokens_to_cost};
pub use ledger::{DailySummary, LedgerEntry, ModelUsage, UsageLedger};
pub use tracker::CostTracker;
pub use types::{CostBreakdown, CostError, CostSummary, ModelPricing, ProviderTotals, UsageTokens};
