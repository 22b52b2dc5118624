//! HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, body limit, gzip)
//!     → rpc.rs (POST /rpc → Dispatcher::invoke → ResponseEnvelope)
//!     → rpc.rs (POST /rpc/stream → Dispatcher::open_stream → NDJSON)
//!     → websocket.rs (GET /ws/transactions/{address} → monitor subscription)
//! ```

pub mod rpc;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
