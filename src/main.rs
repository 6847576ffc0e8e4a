//! docqa-gateway - document Q&A LLM gateway
//!
//! Serves the summarize/ask HTTP surface on top of the request stream and
//! dispatcher pool.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use docqa_gateway::config::LogFormat;
use docqa_gateway::utils::logging::init_logging;
use docqa_gateway::{Config, Gateway};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// Configuration file picked up when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";

#[derive(Debug, Parser)]
#[command(name = "docqa-gateway", version, about)]
struct Cli {
    /// YAML configuration file; without it, config/gateway.yaml or the environment is used
    #[arg(short, long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Log output format: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH)
            .await
            .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?,
        None => Config::from_env().context("building configuration from the environment")?,
    };

    if let Some(host) = &cli.host {
        config.gateway.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.gateway.server.port = port;
    }
    if let Some(format) = cli.log_format {
        config.gateway.logging.format = format;
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli).await?;
    init_logging(config.logging());
    info!(
        "docqa-gateway {} listening on {}",
        docqa_gateway::VERSION,
        config.server().address()
    );

    let gateway = Gateway::new(config).await?;
    gateway.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            // Print error using Display (not Debug) to preserve newlines
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
