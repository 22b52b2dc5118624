//! Ethereum JSON-RPC gateway library.
//!
//! Wallet custody, transaction submission, contract calls and event queries
//! behind one envelope, with validation, error normalization and a
//! block-polling transaction monitor.

// Core pipeline
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod validation;

// Chain access and monitoring
pub mod blockchain;
pub mod monitor;

// Transport and cross-cutting concerns
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dispatch::Dispatcher;
pub use envelope::ResponseEnvelope;
pub use errors::{ApiError, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use monitor::TransactionMonitor;
