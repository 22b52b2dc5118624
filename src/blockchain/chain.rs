//! The seam between the gateway and an Ethereum node.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::types::{
    BlockSelector, CallRequest, ChainBlock, ChainError, ChainLog, ChainReceipt, ChainResult,
    ChainTransaction, LogQuery,
};

/// Chain operations used by handlers and the transaction monitor.
///
/// Implementations categorize their failures into [`ChainError`] so the
/// normalizer never has to parse transport errors.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id the client is configured for.
    fn chain_id(&self) -> u64;

    async fn get_balance(&self, address: Address, block: BlockSelector) -> ChainResult<U256>;

    async fn get_transaction_count(&self, address: Address, block: BlockSelector)
        -> ChainResult<u64>;

    async fn get_gas_price(&self) -> ChainResult<u128>;

    async fn get_max_priority_fee(&self) -> ChainResult<u128>;

    /// `Ok(None)` when the node has no such block.
    async fn get_block(&self, selector: BlockSelector, full: bool)
        -> ChainResult<Option<ChainBlock>>;

    async fn get_block_number(&self) -> ChainResult<u64>;

    /// Fails with [`ChainError::TransactionNotFound`] when the node does not
    /// know the hash.
    async fn get_transaction(&self, hash: B256) -> ChainResult<ChainTransaction>;

    /// `Ok(None)` while the transaction is pending or unknown.
    async fn get_transaction_receipt(&self, hash: B256) -> ChainResult<Option<ChainReceipt>>;

    async fn estimate_gas(&self, tx: &CallRequest) -> ChainResult<u64>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<B256>;

    async fn call(&self, tx: &CallRequest, block: BlockSelector) -> ChainResult<Bytes>;

    async fn get_code(&self, address: Address) -> ChainResult<Bytes>;

    async fn get_logs(&self, query: &LogQuery) -> ChainResult<Vec<ChainLog>>;

    /// Poll for a receipt until it appears or `wait` elapses.
    async fn wait_for_receipt(
        &self,
        hash: B256,
        wait: Duration,
        poll_interval: Duration,
    ) -> ChainResult<ChainReceipt> {
        let result = timeout(wait, async {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.get_transaction_receipt(hash).await? {
                    Some(receipt) => return Ok(receipt),
                    None => tracing::debug!(tx_hash = %hash, "Transaction pending"),
                }
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(ChainError::Timeout(wait.as_secs())),
        }
    }

    /// Reachable if the head block can be read.
    async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }
}
