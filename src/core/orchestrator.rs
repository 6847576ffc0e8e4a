//! Orchestrator
//!
//! Builds every component from the configuration once at startup, owns the
//! worker pool and the retention sweep, and shuts them down gracefully.

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, StreamBackend};
use crate::core::correlation::ResponseStore;
use crate::core::cost::{CostTracker, ModelPricing, PricingTable, UsageLedger};
use crate::core::dispatcher::{Dispatcher, ProviderPolicy, WorkerPool, spawn_workers};
use crate::core::documents::{
    DirectoryDocumentStore, DocumentEvent, DocumentLibrary, DocumentStore, InMemoryDocumentStore,
    PlainTextExtractor,
};
use crate::core::gateway::RequestGateway;
use crate::core::providers::{LlmProvider, ProviderRegistry, build_provider};
use crate::core::requests::Request;
use crate::core::stream::{InMemoryStream, MessageLog};
use crate::utils::error::{GatewayError, Result};

/// Owns the running pipeline
#[derive(Debug)]
pub struct Orchestrator {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    pricing: Arc<PricingTable>,
    library: DocumentLibrary,
    responses: Arc<ResponseStore>,
    tracker: Arc<CostTracker>,
    ledger: Option<Arc<UsageLedger>>,
    log: Arc<dyn MessageLog<Request>>,
    dispatcher: Arc<Dispatcher>,
    gateway: Arc<RequestGateway>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Option<(WorkerPool, JoinHandle<()>)>>,
}

impl Orchestrator {
    /// Build adapters for every configured provider, then the pipeline
    pub async fn new(config: Config) -> Result<Self> {
        let providers = config
            .providers()
            .iter()
            .map(|p| build_provider(p).map_err(GatewayError::from))
            .collect::<Result<Vec<_>>>()?;
        Self::with_providers(config, providers).await
    }

    /// Build the pipeline around the given adapters
    pub async fn with_providers(
        config: Config,
        providers: Vec<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            debug!(provider = provider.name(), "Registered provider");
            registry.register_provider(provider);
        }
        let mut pricing = PricingTable::new();
        for model in config.models() {
            let provider = model.provider.as_str();
            if registry.provider(provider).is_none() {
                warn!(model = %model.choice, provider, "Model routes to a provider without an adapter");
            }
            registry.register_model(&model.choice, provider, &model.model);
            if let Some((input, output)) = model.prices() {
                pricing.insert(ModelPricing::new(provider, &model.model, input, output))?;
            }
        }
        info!(
            providers = ?registry.provider_names(),
            models = registry.routes().len(),
            priced = pricing.len(),
            "Provider registry ready"
        );

        let documents: Arc<dyn DocumentStore> = match &config.documents().storage_dir {
            Some(dir) => Arc::new(DirectoryDocumentStore::open(dir).await?),
            None => Arc::new(InMemoryDocumentStore::new()),
        };
        let mut library =
            DocumentLibrary::new(Arc::clone(&documents), Arc::new(PlainTextExtractor));
        if let Some(key) = &config.stream().document_events {
            library = library.with_events(Self::open_stream(&config, key).await?);
        }

        let log = Self::open_stream(&config, &config.stream().request_stream).await?;
        let responses = Arc::new(ResponseStore::new(config.requests().retention_ttl()));
        let tracker = Arc::new(CostTracker::new());
        let ledger = config
            .ledger()
            .enabled
            .then(|| Arc::new(UsageLedger::new(&config.ledger().dir)));

        let registry = Arc::new(registry);
        let pricing = Arc::new(pricing);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&pricing),
            Arc::clone(&documents),
            Arc::clone(&responses),
            Arc::clone(&tracker),
            config.dispatcher(),
        );
        for provider in config.providers() {
            dispatcher = dispatcher.with_provider_policy(provider.name(), ProviderPolicy::from(provider));
        }
        if let Some(ledger) = &ledger {
            dispatcher = dispatcher.with_ledger(Arc::clone(ledger));
        }

        let gateway = RequestGateway::new(
            Arc::clone(&registry),
            Arc::clone(&pricing),
            documents,
            Arc::clone(&responses),
            Arc::clone(&log),
            config.requests().await_timeout(),
        );

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            registry,
            pricing,
            library,
            responses,
            tracker,
            ledger,
            log,
            dispatcher: Arc::new(dispatcher),
            gateway: Arc::new(gateway),
            shutdown,
            tasks: Mutex::new(None),
        })
    }

    /// Open the log at `key` on the configured backend
    async fn open_stream<T>(config: &Config, key: &str) -> Result<Arc<dyn MessageLog<T>>>
    where
        T: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let stream = config.stream();
        match stream.backend {
            StreamBackend::Memory => {
                info!(stream = key, lease = ?stream.lease(), "Using in-memory stream");
                Ok(Arc::new(InMemoryStream::new(stream.lease())))
            }
            #[cfg(feature = "redis")]
            StreamBackend::Redis => {
                let redis = crate::core::stream::RedisStream::connect(
                    &stream.redis_url,
                    key,
                    stream.lease(),
                )
                .await?;
                Ok(Arc::new(redis))
            }
            #[cfg(not(feature = "redis"))]
            StreamBackend::Redis => Err(GatewayError::Config(
                "The redis stream backend requires the `redis` feature".to_string(),
            )),
        }
    }

    /// Spawn the workers and the retention sweep; a second call is a no-op
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            return;
        }
        let stream = self.config.stream();
        let workers = spawn_workers(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.log),
            &stream.consumer_group,
            self.config.dispatcher().workers,
            stream.block(),
            self.shutdown.subscribe(),
        );
        let sweeper = tokio::spawn(sweep(
            Arc::clone(&self.responses),
            self.config.requests().sweep_interval(),
            self.shutdown.subscribe(),
        ));
        *tasks = Some((workers, sweeper));
    }

    /// Stop taking new messages and wait for in-flight requests to finish
    pub async fn shutdown(&self) {
        let tasks = self.tasks.lock().take();
        let Some((workers, sweeper)) = tasks else {
            return;
        };
        info!("Shutting down dispatcher");
        self.shutdown.send_replace(true);
        workers.join().await;
        if let Err(e) = sweeper.await {
            warn!("Retention sweep task failed: {}", e);
        }
        info!("Dispatcher stopped");
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn pricing(&self) -> &Arc<PricingTable> {
        &self.pricing
    }

    pub fn library(&self) -> &DocumentLibrary {
        &self.library
    }

    pub fn responses(&self) -> &Arc<ResponseStore> {
        &self.responses
    }

    pub fn tracker(&self) -> &Arc<CostTracker> {
        &self.tracker
    }

    pub fn ledger(&self) -> Option<&Arc<UsageLedger>> {
        self.ledger.as_ref()
    }

    pub fn stream(&self) -> &Arc<dyn MessageLog<Request>> {
        &self.log
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }
}

/// Evict terminal records past their retention TTL until shutdown
async fn sweep(
    responses: Arc<ResponseStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = responses.evict_expired();
                if evicted > 0 {
                    debug!(evicted, "Evicted expired request records");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
