//! # docqa-gateway
//!
//! Document question-answering gateway. Callers pick a document and ask for
//! a summary or an answer; the gateway routes each request over a durable
//! request stream to one of several interchangeable LLM providers, with
//! retry, rate limiting, circuit breaking and per-call cost accounting.
//!
//! ## Features
//!
//! - **Decoupled execution**: submission enqueues, a worker pool executes,
//!   callers await or poll the single terminal Response
//! - **At-least-once stream**: in-memory or Redis Streams consumer groups
//!   with lease-based redelivery
//! - **Provider adapters**: OpenAI-style (also DeepSeek, xAI, LiteLLM
//!   proxies), Anthropic Messages, Google `generateContent`
//! - **Cost accounting**: exact per-call cost from a static price table
//!
//! ## Gateway Mode
//!
//! ```rust,no_run
//! use docqa_gateway::{Gateway, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     let gateway = Gateway::new(config).await?;
//!     gateway.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Library Mode
//!
//! ```rust,no_run
//! use docqa_gateway::{Config, Orchestrator, SubmitRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(Config::from_env()?).await?;
//!     orchestrator.start();
//!
//!     let document = orchestrator.library().ingest("report.txt", b"Revenue grew 12%.").await?;
//!     let gateway = orchestrator.gateway();
//!     let id = gateway.submit(SubmitRequest::summarize(&document.id, "GPT-4o")).await?;
//!     let response = gateway.await_response(&id, None).await?;
//!     println!("{:?} cost {}", response.text, response.cost);
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod server;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::gateway::{RequestGateway, SubmitRequest};
pub use core::orchestrator::Orchestrator;
pub use core::providers::{LlmProvider, ProviderError, ProviderRegistry, ProviderType};
pub use core::requests::{Request, RequestId, RequestKind, RequestStatus, Response};
pub use utils::error::{ErrorCode, ErrorDetail, GatewayError, Result};

use tracing::{debug, info};

/// The HTTP gateway: configuration plus the server around the pipeline
pub struct Gateway {
    config: Config,
    server: server::HttpServer,
}

impl Gateway {
    /// Create a new gateway instance
    pub async fn new(config: Config) -> Result<Self> {
        info!("Creating new gateway instance");

        let server = server::HttpServer::new(&config).await?;

        Ok(Self { config, server })
    }

    /// Run the gateway server until shutdown
    pub async fn run(self) -> Result<()> {
        info!("Starting document Q&A gateway");
        debug!(
            providers = self.config.providers().len(),
            models = self.config.models().len(),
            backend = ?self.config.stream().backend,
            "Configuration"
        );

        self.server.start().await
    }
}

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
