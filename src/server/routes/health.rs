//! Health check, model catalogue and usage endpoints

use crate::core::correlation::StoreStats;
use crate::core::cost::{CostSummary, DailySummary};
use crate::server::state::AppState;
use crate::utils::error::{CircuitBreakerMetrics, CircuitState, GatewayError};
use actix_web::{HttpResponse, Result as ActixResult, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/models", web::get().to(list_models))
        .route("/usage", web::get().to(usage));
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamHealth {
    pub length: Option<usize>,
    pub pending: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// `healthy`, or `degraded` when a breaker is open or the stream is unreachable
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub uptime_seconds: u64,
    pub requests: StoreStats,
    pub stream: StreamHealth,
    pub circuit_breakers: BTreeMap<&'static str, CircuitBreakerMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub choice: String,
    pub provider: &'static str,
    pub model: String,
    pub input_cost_per_1k_tokens: Option<f64>,
    pub output_cost_per_1k_tokens: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Day of the ledger summary, `YYYY-MM-DD`
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub totals: CostSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<DailySummary>,
}

/// Liveness plus pipeline state
async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");
    let orchestrator = &state.orchestrator;
    let group = &state.config.stream().consumer_group;

    let length = orchestrator.stream().len().await;
    let pending = orchestrator.stream().pending_count(group).await;
    if let Err(e) = &length {
        warn!("Request stream unreachable: {}", e);
    }

    let circuit_breakers: BTreeMap<_, _> =
        orchestrator.dispatcher().breaker_metrics().into_iter().collect();
    let degraded = length.is_err()
        || circuit_breakers
            .values()
            .any(|m| m.state != CircuitState::Closed);

    Ok(HttpResponse::Ok().json(HealthStatus {
        status: if degraded { "degraded" } else { "healthy" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime_seconds(),
        requests: orchestrator.responses().stats(),
        stream: StreamHealth {
            length: length.ok(),
            pending: pending.ok(),
        },
        circuit_breakers,
    }))
}

/// Model choices callers may pass, with their prices
async fn list_models(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let pricing = state.orchestrator.pricing();
    let mut models: Vec<ModelInfo> = state
        .orchestrator
        .registry()
        .routes()
        .into_iter()
        .map(|route| {
            let price = pricing.get(route.provider, &route.model).ok();
            ModelInfo {
                choice: route.choice.clone(),
                provider: route.provider,
                model: route.model.clone(),
                input_cost_per_1k_tokens: price.map(|p| p.input_cost_per_1k_tokens),
                output_cost_per_1k_tokens: price.map(|p| p.output_cost_per_1k_tokens),
            }
        })
        .collect();
    models.sort_by(|a, b| a.choice.cmp(&b.choice));

    Ok(HttpResponse::Ok().json(models))
}

/// Running cost totals, plus a ledger day when the ledger is enabled
async fn usage(
    state: web::Data<AppState>,
    query: web::Query<UsageQuery>,
) -> ActixResult<HttpResponse> {
    let totals = state.orchestrator.tracker().summary();

    let daily = match state.orchestrator.ledger() {
        Some(ledger) => {
            let date = match query.date.as_deref() {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    GatewayError::validation(format!("date must be YYYY-MM-DD, got '{}'", raw))
                })?,
                None => Utc::now().date_naive(),
            };
            Some(ledger.daily_summary(date).await?)
        }
        None => None,
    };

    Ok(HttpResponse::Ok().json(UsageReport { totals, daily }))
}
