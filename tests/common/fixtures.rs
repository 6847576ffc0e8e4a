//! Test fixtures
//!
//! [`Pipeline`] wires the request stream, dispatcher and gateway by hand
//! with test-sized timeouts, so a test can stop short of starting workers,
//! take messages as a "crashed" consumer, or inspect every component.

use super::providers::ScriptedProvider;
use docqa_gateway::config::{CircuitBreakerSettings, DispatcherConfig, RetrySettings};
use docqa_gateway::core::correlation::ResponseStore;
use docqa_gateway::core::cost::{CostTracker, ModelPricing, PricingTable};
use docqa_gateway::core::dispatcher::{Dispatcher, ProviderPolicy, WorkerPool, spawn_workers};
use docqa_gateway::core::documents::{Document, DocumentStore, InMemoryDocumentStore, to_markdown};
use docqa_gateway::core::gateway::RequestGateway;
use docqa_gateway::core::providers::{LlmProvider, ProviderRegistry};
use docqa_gateway::core::stream::InMemoryStream;
use docqa_gateway::{Request, RequestId, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Consumer group the pipeline's workers read in
pub const GROUP: &str = "dispatchers";
/// Document every pipeline starts with
pub const DOCUMENT_ID: &str = "report";
/// Text of the single page of [`DOCUMENT_ID`]
pub const DOCUMENT_TEXT: &str = "Revenue grew 12% in 2024, driven by the new subscription tier.";

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    provider: Arc<ScriptedProvider>,
    lease: Duration,
    call_timeout: Duration,
    max_attempts: u32,
    failure_threshold: u32,
    cooldown_secs: u64,
    await_timeout: Duration,
}

impl PipelineBuilder {
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn circuit_breaker(mut self, failure_threshold: u32, cooldown_secs: u64) -> Self {
        self.failure_threshold = failure_threshold;
        self.cooldown_secs = cooldown_secs;
        self
    }

    /// Assemble the components without starting workers
    pub async fn build(self) -> Pipeline {
        let name = self.provider.name();

        let mut registry = ProviderRegistry::new();
        registry.register_provider(self.provider.clone());
        registry.register_model("GPT-4o", name, "gpt-4o");
        registry.register_model("Grok", name, "grok-1");
        let registry = Arc::new(registry);

        // Grok stays unpriced
        let pricing = Arc::new(
            PricingTable::from_entries([ModelPricing::new(name, "gpt-4o", 5.0, 15.0)])
                .expect("valid pricing"),
        );

        let documents: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let content = to_markdown(DOCUMENT_ID, &[DOCUMENT_TEXT.to_string()]);
        documents
            .insert(Document::new(DOCUMENT_ID, DOCUMENT_ID, content, 1))
            .await
            .expect("insert document");

        let log = Arc::new(InMemoryStream::<Request>::new(self.lease));
        let responses = Arc::new(ResponseStore::new(Duration::from_secs(300)));
        let tracker = Arc::new(CostTracker::new());

        let config = DispatcherConfig {
            retry: RetrySettings {
                max_attempts: self.max_attempts,
                base_delay: 5,
                max_delay: 20,
                ..RetrySettings::default()
            },
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: self.failure_threshold,
                cooldown_secs: self.cooldown_secs,
            },
            permit_wait_ms: 200,
            ..DispatcherConfig::default()
        };
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&pricing),
            Arc::clone(&documents),
            Arc::clone(&responses),
            Arc::clone(&tracker),
            &config,
        )
        .with_provider_policy(
            name,
            ProviderPolicy {
                call_timeout: self.call_timeout,
                max_concurrent: 8,
                rpm: 0,
            },
        );

        let gateway = RequestGateway::new(
            registry,
            pricing,
            Arc::clone(&documents),
            Arc::clone(&responses),
            log.clone(),
            self.await_timeout,
        );

        let (shutdown, _) = watch::channel(false);
        Pipeline {
            provider: self.provider,
            log,
            responses,
            tracker,
            documents,
            dispatcher: Arc::new(dispatcher),
            gateway,
            shutdown,
            workers: None,
        }
    }

    /// Assemble and start `workers` workers
    pub async fn start(self, workers: usize) -> Pipeline {
        let mut pipeline = self.build().await;
        pipeline.start_workers(workers);
        pipeline
    }
}

/// Hand-wired stream, dispatcher and gateway around one scripted provider
pub struct Pipeline {
    pub provider: Arc<ScriptedProvider>,
    pub log: Arc<InMemoryStream<Request>>,
    pub responses: Arc<ResponseStore>,
    pub tracker: Arc<CostTracker>,
    pub documents: Arc<dyn DocumentStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub gateway: RequestGateway,
    shutdown: watch::Sender<bool>,
    workers: Option<WorkerPool>,
}

impl Pipeline {
    pub fn builder(provider: Arc<ScriptedProvider>) -> PipelineBuilder {
        PipelineBuilder {
            provider,
            lease: Duration::from_secs(30),
            call_timeout: Duration::from_millis(100),
            max_attempts: 3,
            failure_threshold: 1,
            cooldown_secs: 60,
            await_timeout: Duration::from_secs(5),
        }
    }

    pub fn start_workers(&mut self, count: usize) {
        if self.workers.is_none() {
            self.workers = Some(spawn_workers(
                Arc::clone(&self.dispatcher),
                self.log.clone(),
                GROUP,
                count,
                Duration::from_millis(50),
                self.shutdown.subscribe(),
            ));
        }
    }

    /// Await a response with the pipeline's default deadline
    pub async fn response(&self, id: &RequestId) -> Response {
        self.gateway
            .await_response(id, None)
            .await
            .expect("response before the await deadline")
    }

    /// Stop the workers and wait for them
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(workers) = self.workers.take() {
            workers.join().await;
        }
    }
}

/// Poll `check` every 10ms until it holds or `deadline` passes
pub async fn eventually<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let until = tokio::time::Instant::now() + deadline;
    while tokio::time::Instant::now() < until {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
