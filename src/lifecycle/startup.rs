//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Hand the assembled pieces to the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The chain client is injected so the same wiring serves production
//!   and in-process tests

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::blockchain::chain::ChainClient;
use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::ChainError;
use crate::config::schema::GatewayConfig;
use crate::dispatch::{Dispatcher, Limits, Services};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::monitor::{MonitorSettings, TransactionMonitor};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Chain client: {0}")]
    Chain(#[from] ChainError),

    #[error("Listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Every long-lived component, wired together.
pub struct Gateway {
    pub dispatcher: Dispatcher,
    pub monitor: TransactionMonitor,
    pub server: HttpServer,
}

/// Wire dispatcher, monitor and server around `chain`.
pub fn assemble(config: &GatewayConfig, chain: Arc<dyn ChainClient>) -> Gateway {
    let services = Services::new(chain.clone(), Limits::from(config));
    let dispatcher = Dispatcher::new(services, config.debug).with_pretty(config.response.pretty_print);
    let monitor = TransactionMonitor::new(chain, MonitorSettings::from(&config.monitor));
    let server = HttpServer::new(config, dispatcher.clone(), monitor.clone());

    if config.debug {
        tracing::warn!("Debug mode enabled: internal errors include exception details");
    }
    Gateway {
        dispatcher,
        monitor,
        server,
    }
}

/// Connect to the node, bind the listener and serve until a signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = BlockchainClient::new(config.blockchain.clone()).await?;
    let gateway = assemble(&config, Arc::new(client));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        chain_id = config.blockchain.chain_id,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    gateway.server.run(listener, receiver).await?;
    Ok(())
}
