//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request id, timeout, body limit, gzip)
//! - Bind the server to a listener and stop on the shutdown signal

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    compression::{
        predicate::{NotForContentType, Predicate, SizeAbove},
        CompressionLayer,
    },
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{GatewayConfig, ResponseConfig};
use crate::dispatch::Dispatcher;
use crate::envelope::stream::NDJSON;
use crate::http::{rpc, websocket};
use crate::monitor::TransactionMonitor;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub monitor: TransactionMonitor,
    pub response: ResponseConfig,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    monitor: TransactionMonitor,
}

impl HttpServer {
    pub fn new(config: &GatewayConfig, dispatcher: Dispatcher, monitor: TransactionMonitor) -> Self {
        let state = AppState {
            dispatcher,
            monitor: monitor.clone(),
            response: config.response.clone(),
        };
        let router = Self::build_router(config, state);
        Self { router, monitor }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let compress_when = SizeAbove::new(config.response.compress_threshold_bytes)
            .and(NotForContentType::const_new(NDJSON));

        Router::new()
            .route("/rpc", post(rpc::invoke))
            .route("/rpc/stream", post(rpc::stream))
            .route("/ws/transactions/{address}", get(websocket::subscribe))
            .route("/health", get(rpc::health))
            .with_state(state)
            .layer(CompressionLayer::new().compress_when(compress_when))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then stop every watch.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = self.monitor.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
                monitor.stop_all();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
