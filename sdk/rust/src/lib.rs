//! Client for the eth-rpc-gateway HTTP API.
//!
//! ```no_run
//! # async fn demo() -> Result<(), sdk_rust::SdkError> {
//! let client = sdk_rust::GatewayClient::new("http://localhost:8080");
//! let envelope = client
//!     .invoke("eth_getBlockNumber", serde_json::json!({}))
//!     .await?;
//! println!("{:?}", envelope.into_result()?);
//! # Ok(())
//! # }
//! ```

mod client;
mod types;

pub use client::GatewayClient;
pub use types::{Envelope, ErrorBody, Health, Metadata, SdkError};
