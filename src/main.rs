//! Ethereum RPC gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /rpc ──────────┐
//!   POST /rpc/stream ───┼─▶ http ─▶ dispatch ─▶ validation ─▶ handlers ─▶ ChainClient ─▶ node
//!   GET  /ws/... ──┐    │                │                        │
//!                  │    │                ▼                        ▼
//!                  │    │          ErrorNormalizer ◀──────── Failure
//!                  │    │                │
//!                  │    └────────── ResponseEnvelope / NDJSON
//!                  │
//!                  └─▶ TransactionMonitor (poll task per address) ─▶ ChainClient
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use eth_rpc_gateway::config::{load_config, load_from_env, ConfigError, GatewayConfig};
use eth_rpc_gateway::lifecycle::startup;
use eth_rpc_gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "eth-rpc-gateway", version, about = "Ethereum JSON-RPC gateway")]
struct Args {
    /// TOML configuration file. Defaults plus GATEWAY_* variables when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Include exception details in internal errors.
    #[arg(long)]
    debug: bool,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,
}

fn load(args: &Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    if args.debug {
        config.debug = true;
    }
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rpc_url = %config.blockchain.rpc_url,
        bind_address = %config.listener.bind_address,
        "eth-rpc-gateway starting"
    );

    match startup::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}
