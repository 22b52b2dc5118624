//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC URL, failover URLs, chain id)
//!     → client.rs (alloy providers, failover, error categorization)
//!     → chain.rs (ChainClient trait consumed by handlers and the monitor)
//!     → history.rs (block scans for address history)
//!     → format.rs (caller-facing JSON shapes)
//! wallet.rs (in-memory keys, signing)
//! contract.rs (loaded ABIs, call binding, log decoding)
//! ```
//!
//! # Security Constraints
//! - Private keys live in memory only and are never logged
//! - All RPC calls have configurable timeouts

pub mod chain;
pub mod client;
pub mod contract;
pub mod format;
pub mod history;
pub mod types;
pub mod wallet;

pub use chain::ChainClient;
pub use client::BlockchainClient;
pub use contract::{ContractRegistry, LoadedContract};
pub use format::FormattedTransaction;
pub use types::{BlockSelector, ChainError, ChainId, ChainResult};
pub use wallet::{ManagedWallet, WalletStore};
