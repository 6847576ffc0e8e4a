//! Dispatcher
//!
//! Takes requests off the request stream and drives each one to exactly one
//! terminal Response: resolve the route, check the price entry, load the
//! document, pass the provider's circuit breaker and rate limiter, call the
//! adapter under a timeout with retries, then price the result.

pub mod limiter;
pub mod prompt;
pub mod worker;

pub use limiter::{Permit, ProviderLimiter};
pub use worker::{WorkerPool, spawn_workers};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{DispatcherConfig, ProviderConfig};
use crate::core::correlation::ResponseStore;
use crate::core::cost::{CostBreakdown, CostTracker, LedgerEntry, PricingTable, UsageLedger};
use crate::core::documents::DocumentStore;
use crate::core::providers::{
    Completion, CompletionRequest, ModelRoute, ProviderError, ProviderRegistry,
};
use crate::core::requests::{Request, Response};
use crate::core::stream::Delivery;
use crate::utils::error::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, GatewayError, Result,
    RetryPolicy,
};

/// Per-provider call limits
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    /// Deadline for one attempt
    pub call_timeout: Duration,
    pub max_concurrent: u32,
    /// Requests per minute, 0 for no quota
    pub rpm: u32,
}

impl From<&ProviderConfig> for ProviderPolicy {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            call_timeout: Duration::from_secs(config.timeout),
            max_concurrent: config.max_concurrent_requests,
            rpm: config.rpm,
        }
    }
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

#[derive(Debug)]
struct ProviderGuard {
    policy: ProviderPolicy,
    limiter: ProviderLimiter,
    breaker: CircuitBreaker,
}

impl ProviderGuard {
    fn new(provider: &'static str, policy: ProviderPolicy, breaker: CircuitBreakerConfig) -> Self {
        Self {
            limiter: ProviderLimiter::new(provider, policy.max_concurrent, policy.rpm),
            breaker: CircuitBreaker::new(provider, breaker),
            policy,
        }
    }
}

struct Called {
    completion: Completion,
    cost: CostBreakdown,
    retries: u32,
}

struct Failed {
    error: GatewayError,
    retries: u32,
}

/// Why one attempt ended without a completion
enum AttemptError {
    /// No quota for the attempt; the provider was not called
    Quota(GatewayError),
    Provider(ProviderError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_transient())
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quota(e) => e.fmt(f),
            Self::Provider(e) => e.fmt(f),
        }
    }
}

impl Failed {
    fn before_call(error: impl Into<GatewayError>) -> Self {
        Self {
            error: error.into(),
            retries: 0,
        }
    }
}

/// Shared by every worker of the pool
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    pricing: Arc<PricingTable>,
    documents: Arc<dyn DocumentStore>,
    responses: Arc<ResponseStore>,
    tracker: Arc<CostTracker>,
    ledger: Option<Arc<UsageLedger>>,
    guards: HashMap<&'static str, ProviderGuard>,
    breaker_config: CircuitBreakerConfig,
    retry: RetryPolicy,
    permit_wait: Duration,
    max_tokens: u32,
}

impl Dispatcher {
    /// Every provider in the registry starts with the default policy
    pub fn new(
        registry: Arc<ProviderRegistry>,
        pricing: Arc<PricingTable>,
        documents: Arc<dyn DocumentStore>,
        responses: Arc<ResponseStore>,
        tracker: Arc<CostTracker>,
        config: &DispatcherConfig,
    ) -> Self {
        let breaker_config = CircuitBreakerConfig::from(&config.circuit_breaker);
        let guards = registry
            .provider_names()
            .into_iter()
            .map(|name| {
                (
                    name,
                    ProviderGuard::new(name, ProviderPolicy::default(), breaker_config.clone()),
                )
            })
            .collect();

        Self {
            registry,
            pricing,
            documents,
            responses,
            tracker,
            ledger: None,
            guards,
            breaker_config,
            retry: RetryPolicy::new((&config.retry).into()),
            permit_wait: config.permit_wait(),
            max_tokens: config.max_tokens,
        }
    }

    /// Set the call limits of one provider
    pub fn with_provider_policy(mut self, provider: &'static str, policy: ProviderPolicy) -> Self {
        let guard = ProviderGuard::new(provider, policy, self.breaker_config.clone());
        self.guards.insert(provider, guard);
        self
    }

    /// Append every successful call to a usage ledger
    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn responses(&self) -> &Arc<ResponseStore> {
        &self.responses
    }

    /// Circuit breaker metrics by provider, sorted by name
    pub fn breaker_metrics(&self) -> Vec<(&'static str, CircuitBreakerMetrics)> {
        let mut metrics: Vec<_> = self
            .guards
            .iter()
            .map(|(name, guard)| (*name, guard.breaker.metrics()))
            .collect();
        metrics.sort_by_key(|(name, _)| *name);
        metrics
    }

    /// Process one delivery and acknowledge it once its Response is recorded
    pub async fn handle(&self, delivery: Delivery<Request>) -> Result<()> {
        let Delivery { message, ack } = delivery;
        let request = &message.payload;

        if self.responses.is_terminal(&request.id) {
            debug!(
                request_id = %request.id,
                delivery_count = message.delivery_count,
                "Request already has a response, acknowledging redelivery"
            );
            ack.acknowledge().await?;
            return Ok(());
        }
        if message.is_redelivery() {
            warn!(
                request_id = %request.id,
                delivery_count = message.delivery_count,
                "Processing redelivered request"
            );
        }

        self.responses.mark_dispatched(&request.id);
        let response = self.process(request).await;

        info!(
            request_id = %request.id,
            status = ?response.status,
            provider = response.provider.as_deref().unwrap_or("-"),
            retries = response.retries,
            latency_ms = response.latency_ms,
            cost = response.cost,
            "Request finished"
        );

        self.responses.complete(response);
        ack.acknowledge().await?;
        Ok(())
    }

    /// Drive one request to its terminal Response
    pub async fn process(&self, request: &Request) -> Response {
        let started = Instant::now();

        let Some(route) = self.registry.resolve(&request.model_choice).cloned() else {
            let error = GatewayError::validation(format!(
                "Model choice '{}' is not configured",
                request.model_choice
            ));
            return Response::failure(request.id.clone(), &error, None, elapsed_ms(started), 0);
        };

        match self.call(request, &route).await {
            Ok(Called {
                completion,
                cost,
                retries,
            }) => {
                self.tracker.add_request_cost(&cost);
                let response = Response::success(
                    request.id.clone(),
                    &route,
                    completion,
                    &cost,
                    elapsed_ms(started),
                    retries,
                );
                self.record_usage(request, &response).await;
                response
            }
            Err(Failed { error, retries }) => Response::failure(
                request.id.clone(),
                &error,
                Some(&route),
                elapsed_ms(started),
                retries,
            ),
        }
    }

    async fn call(&self, request: &Request, route: &ModelRoute) -> std::result::Result<Called, Failed> {
        // A pricing gap must not cost a provider call
        self.pricing
            .get(route.provider, &route.model)
            .map_err(Failed::before_call)?;

        let (Some(provider), Some(guard)) = (
            self.registry.provider(route.provider),
            self.guards.get(route.provider),
        ) else {
            return Err(Failed::before_call(GatewayError::Config(format!(
                "Provider '{}' is not registered",
                route.provider
            ))));
        };

        let document = match self.documents.get(&request.document_id).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                return Err(Failed::before_call(GatewayError::NotFound(format!(
                    "Document '{}' no longer exists",
                    request.document_id
                ))));
            }
            Err(e) => return Err(Failed::before_call(e)),
        };
        let prompt = prompt::build_prompt(request, &document).map_err(Failed::before_call)?;

        guard.breaker.try_acquire().map_err(Failed::before_call)?;
        let slot_deadline = Instant::now() + self.permit_wait;
        let _permit = match guard.limiter.acquire_slot(self.permit_wait).await {
            Ok(permit) => permit,
            Err(e) => {
                guard.breaker.release();
                return Err(Failed::before_call(e));
            }
        };

        let call_timeout = guard.policy.call_timeout;
        let completion_request = CompletionRequest {
            prompt,
            model: route.model.clone(),
            max_tokens: self.max_tokens,
            timeout: call_timeout,
        };

        let outcome = self
            .retry
            .call(
                |attempt| {
                    let provider = Arc::clone(&provider);
                    let completion_request = &completion_request;
                    // The first attempt shares its wait with the slot
                    let quota_wait = if attempt == 1 {
                        slot_deadline.saturating_duration_since(Instant::now())
                    } else {
                        self.permit_wait
                    };
                    async move {
                        if let Err(e) = guard.limiter.await_quota(quota_wait).await {
                            return Err(AttemptError::Quota(e));
                        }
                        debug!(
                            request_id = %request.id,
                            provider = provider.name(),
                            attempt,
                            "Calling provider"
                        );
                        match tokio::time::timeout(call_timeout, provider.complete(completion_request))
                            .await
                        {
                            Ok(result) => result.map_err(AttemptError::Provider),
                            Err(_) => Err(AttemptError::Provider(ProviderError::timeout(
                                provider.name(),
                                format!("No answer within {:?}", call_timeout),
                            ))),
                        }
                    }
                },
                AttemptError::is_transient,
            )
            .await;

        let retries = outcome.retries();
        match outcome.result {
            Ok(completion) => {
                guard.breaker.record_success();
                let cost = self
                    .pricing
                    .cost(
                        route.provider,
                        &route.model,
                        completion.input_tokens,
                        completion.output_tokens,
                    )
                    .map_err(|e| Failed {
                        error: e.into(),
                        retries,
                    })?;
                Ok(Called {
                    completion,
                    cost,
                    retries,
                })
            }
            Err(AttemptError::Quota(error)) => {
                guard.breaker.release();
                Err(Failed {
                    error,
                    // The rejected attempt never reached the provider
                    retries: retries.saturating_sub(1),
                })
            }
            Err(AttemptError::Provider(error)) => {
                if error.is_transient() {
                    guard.breaker.record_failure();
                } else {
                    guard.breaker.record_success();
                }
                Err(Failed {
                    error: error.into(),
                    retries,
                })
            }
        }
    }

    async fn record_usage(&self, request: &Request, response: &Response) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let entry = LedgerEntry {
            timestamp: response.completed_at,
            request_id: request.id.to_string(),
            kind: request.kind.as_str().to_string(),
            model_choice: request.model_choice.clone(),
            provider: response.provider.clone().unwrap_or_default(),
            model: response.model.clone().unwrap_or_default(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost: response.cost,
            latency_ms: response.latency_ms,
        };
        if let Err(e) = ledger.record(&entry).await {
            warn!(request_id = %request.id, "Failed to write usage ledger: {}", e);
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
