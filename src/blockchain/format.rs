//! JSON shapes returned to callers for chain objects.
//!
//! History queries, single-transaction lookups and the monitor all go
//! through [`FormattedTransaction::from_chain`], so every producer emits the
//! same transaction shape.

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::blockchain::types::{BlockTransactions, ChainBlock, ChainLog, ChainReceipt, ChainTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTransaction {
    pub hash: String,
    pub nonce: u64,
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    /// Wei as a decimal string.
    pub value: String,
    /// Wei as a decimal string.
    pub gas_price: String,
    pub gas: u64,
    pub input: String,
    pub v: String,
    pub r: String,
    pub s: String,
    /// RFC3339 time of the containing block, `None` while pending.
    pub timestamp: Option<String>,
}

impl FormattedTransaction {
    /// `block_timestamp` is the unix time of the containing block, if known.
    pub fn from_chain(tx: &ChainTransaction, block_timestamp: Option<u64>) -> Self {
        Self {
            hash: tx.hash.to_string(),
            nonce: tx.nonce,
            block_hash: tx.block_hash.map(|h| h.to_string()),
            block_number: tx.block_number,
            transaction_index: tx.transaction_index,
            from: checksum(tx.from),
            to: tx.to.map(checksum),
            value: tx.value.to_string(),
            gas_price: tx.gas_price.to_string(),
            gas: tx.gas,
            input: tx.input.to_string(),
            v: format!("{:#x}", tx.v),
            r: hex_quantity(tx.r),
            s: hex_quantity(tx.s),
            timestamp: block_timestamp
                .filter(|_| tx.block_number.is_some())
                .and_then(rfc3339),
        }
    }

    /// True if the transaction was sent from or to `address`.
    pub fn matches_address(&self, address: Address) -> bool {
        let target = checksum(address);
        self.from == target || self.to.as_deref() == Some(target.as_str())
    }
}

pub fn checksum(address: Address) -> String {
    address.to_checksum(None)
}

fn hex_quantity(value: U256) -> String {
    format!("{:#x}", value)
}

fn rfc3339(unix: u64) -> Option<String> {
    let secs = i64::try_from(unix).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

fn hash_opt(hash: Option<B256>) -> Value {
    hash.map(|h| json!(h.to_string())).unwrap_or(Value::Null)
}

pub fn format_log(log: &ChainLog) -> Value {
    json!({
        "address": checksum(log.address),
        "topics": log.topics.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        "data": log.data.to_string(),
        "blockNumber": log.block_number,
        "blockHash": hash_opt(log.block_hash),
        "transactionHash": hash_opt(log.transaction_hash),
        "logIndex": log.log_index,
    })
}

pub fn format_receipt(receipt: &ChainReceipt) -> Value {
    json!({
        "transactionHash": receipt.transaction_hash.to_string(),
        "blockHash": hash_opt(receipt.block_hash),
        "blockNumber": receipt.block_number,
        "transactionIndex": receipt.transaction_index,
        "from": checksum(receipt.from),
        "to": receipt.to.map(checksum),
        "contractAddress": receipt.contract_address.map(checksum),
        "cumulativeGasUsed": receipt.cumulative_gas_used,
        "gasUsed": receipt.gas_used,
        "effectiveGasPrice": receipt.effective_gas_price.to_string(),
        "status": u8::from(receipt.status),
        "logs": receipt.logs.iter().map(format_log).collect::<Vec<_>>(),
    })
}

pub fn format_block(block: &ChainBlock) -> Value {
    let transactions: Vec<Value> = match &block.transactions {
        BlockTransactions::Hashes(hashes) => hashes.iter().map(|h| json!(h.to_string())).collect(),
        BlockTransactions::Full(txs) => txs
            .iter()
            .map(|tx| json!(FormattedTransaction::from_chain(tx, Some(block.timestamp))))
            .collect(),
    };
    json!({
        "number": block.number,
        "hash": block.hash.to_string(),
        "parentHash": block.parent_hash.to_string(),
        "timestamp": block.timestamp,
        "miner": checksum(block.miner),
        "gasUsed": block.gas_used,
        "gasLimit": block.gas_limit,
        "baseFeePerGas": block.base_fee_per_gas.map(|fee| fee.to_string()),
        "transactions": transactions,
    })
}
