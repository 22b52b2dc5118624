//! Chain-facing domain types and error definitions.

use std::fmt;

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::{Filter, TransactionRequest};
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Categorized upstream failures.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// RPC connection or request failed, or an uncategorized node error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Waiting on the chain exceeded its deadline.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Execution reverted on-chain or during simulation.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The node does not know the transaction. Carries the hash when known.
    #[error("Transaction not found: {}", .0.as_deref().unwrap_or("unknown"))]
    TransactionNotFound(Option<String>),

    /// The node rejected the request parameters.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The node reported a head at or past this block but did not serve it.
    #[error("Block {0} not available")]
    BlockUnavailable(u64),

    /// Blockchain client not initialized or disabled.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),

    /// Building or signing a transaction failed locally.
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Result type for blockchain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Named block tags accepted wherever a block is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Latest,
    Pending,
    Earliest,
    Safe,
    Finalized,
}

impl BlockTag {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "latest" => Some(Self::Latest),
            "pending" => Some(Self::Pending),
            "earliest" => Some(Self::Earliest),
            "safe" => Some(Self::Safe),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Pending => "pending",
            Self::Earliest => "earliest",
            Self::Safe => "safe",
            Self::Finalized => "finalized",
        }
    }
}

/// A block tag or an explicit block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockSelector {
    Tag(BlockTag),
    Number(u64),
}

impl Default for BlockSelector {
    fn default() -> Self {
        Self::Tag(BlockTag::Latest)
    }
}

impl BlockSelector {
    pub const LATEST: Self = Self::Tag(BlockTag::Latest);
    pub const PENDING: Self = Self::Tag(BlockTag::Pending);

    pub fn to_number_or_tag(self) -> BlockNumberOrTag {
        match self {
            Self::Number(n) => BlockNumberOrTag::Number(n),
            Self::Tag(BlockTag::Latest) => BlockNumberOrTag::Latest,
            Self::Tag(BlockTag::Pending) => BlockNumberOrTag::Pending,
            Self::Tag(BlockTag::Earliest) => BlockNumberOrTag::Earliest,
            Self::Tag(BlockTag::Safe) => BlockNumberOrTag::Safe,
            Self::Tag(BlockTag::Finalized) => BlockNumberOrTag::Finalized,
        }
    }

    pub fn to_block_id(self) -> BlockId {
        BlockId::Number(self.to_number_or_tag())
    }

    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Number(n) => serde_json::Value::from(n),
            Self::Tag(tag) => serde_json::Value::from(tag.as_str()),
        }
    }
}

impl fmt::Display for BlockSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Tag(tag) => f.write_str(tag.as_str()),
        }
    }
}

/// Transaction as seen by the gateway, independent of the RPC encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: B256,
    pub nonce: u64,
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: u128,
    pub gas: u64,
    pub input: Bytes,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl ChainTransaction {
    /// Sender or recipient equals `address`.
    pub fn touches(&self, address: Address) -> bool {
        self.from == address || self.to == Some(address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockTransactions {
    Hashes(Vec<B256>),
    Full(Vec<ChainTransaction>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub miner: Address,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub base_fee_per_gas: Option<u64>,
    pub transactions: BlockTransactions,
}

impl ChainBlock {
    /// Full transactions in index order; empty when only hashes were fetched.
    pub fn full_transactions(&self) -> &[ChainTransaction] {
        match &self.transactions {
            BlockTransactions::Full(txs) => txs,
            BlockTransactions::Hashes(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub transaction_hash: B256,
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub status: bool,
    pub logs: Vec<ChainLog>,
}

/// Call or transaction parameters. Unset fields are left for the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    /// `None` means contract creation.
    pub to: Option<Address>,
    pub value: Option<U256>,
    pub data: Option<Bytes>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
    pub chain_id: Option<u64>,
}

impl CallRequest {
    pub fn to_request(&self) -> TransactionRequest {
        let mut tx = TransactionRequest::default();
        if let Some(from) = self.from {
            tx = tx.with_from(from);
        }
        match self.to {
            Some(to) => tx = tx.with_to(to),
            None => {
                if let Some(data) = &self.data {
                    tx = tx.with_deploy_code(data.clone());
                }
            }
        }
        if let Some(value) = self.value {
            tx = tx.with_value(value);
        }
        if let (Some(data), Some(_)) = (&self.data, self.to) {
            tx = tx.with_input(data.clone());
        }
        if let Some(gas) = self.gas {
            tx = tx.with_gas_limit(gas);
        }
        if let Some(gas_price) = self.gas_price {
            tx = tx.with_gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            tx = tx.with_nonce(nonce);
        }
        if let Some(chain_id) = self.chain_id {
            tx = tx.with_chain_id(chain_id);
        }
        tx
    }
}

/// Event log query for a single contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub from_block: BlockSelector,
    pub to_block: BlockSelector,
    /// Up to four topic positions; `None` matches anything.
    pub topics: Vec<Option<Vec<B256>>>,
}

impl LogQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new()
            .address(self.address)
            .from_block(self.from_block.to_number_or_tag())
            .to_block(self.to_block.to_number_or_tag());
        for (i, topic) in self.topics.iter().enumerate().take(4) {
            if let Some(values) = topic {
                filter.topics[i] = values.clone().into();
            }
        }
        filter
    }
}
