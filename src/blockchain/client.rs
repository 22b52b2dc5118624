//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state and submit raw transactions
//! - Categorize node errors so callers never parse transport errors
//! - Provide health check for blockchain connectivity

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{
    Block, BlockTransactions as RpcBlockTransactions, Log, Transaction, TransactionReceipt,
};
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::chain::ChainClient;
use crate::blockchain::types::{
    BlockSelector, BlockTransactions, BlockchainConfig, CallRequest, ChainBlock, ChainError,
    ChainId, ChainLog, ChainReceipt, ChainResult, ChainTransaction, LogQuery,
};
use crate::observability::metrics;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC error code geth uses for reverted execution.
const EXECUTION_REVERTED_CODE: i64 = 3;
const INVALID_PARAMS_CODE: i64 = -32602;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Configuration.
    config: BlockchainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only if the primary URL cannot be parsed. An unreachable node is
    /// logged and tolerated so the gateway can start before its node.
    pub async fn new(config: BlockchainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            ChainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => {
                    providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider)
                }
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    providers = client.providers.len(),
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> ChainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Run `call` against each provider in turn.
    ///
    /// A node error response is returned immediately, categorized; another
    /// node would answer the same. Transport failures and timeouts move on
    /// to the next provider.
    async fn with_failover<T, F, Fut>(&self, operation: &'static str, call: F) -> ChainResult<T>
    where
        F: Fn(SharedProvider) -> Fut + Send + Sync,
        Fut: Future<Output = TransportResult<T>> + Send,
        T: Send,
    {
        let mut last_error = String::from("no providers configured");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(categorized) = categorize_response(&e) {
                        return Err(categorized);
                    }
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, operation, "RPC timeout, trying next provider");
                    last_error = format!(
                        "{} timed out after {}s",
                        operation,
                        self.timeout_duration.as_secs()
                    );
                }
            }
        }
        Err(ChainError::Rpc(format!(
            "All RPC providers failed for {}: {}",
            operation, last_error
        )))
    }
}

/// Map a node's JSON-RPC error response to a chain error. Transport level
/// failures return `None`.
fn categorize_response(err: &TransportError) -> Option<ChainError> {
    let payload = err.as_error_resp()?;
    let message = payload.message.to_string();
    if payload.code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert") {
        return Some(ChainError::Reverted(message));
    }
    if payload.code == INVALID_PARAMS_CODE {
        return Some(ChainError::Validation(message));
    }
    Some(ChainError::Rpc(message))
}

fn convert_transaction(tx: &Transaction) -> ChainTransaction {
    let envelope: &TxEnvelope = tx.inner.inner();
    let signature = envelope.signature();
    let parity = u64::from(signature.v());
    let v = match envelope {
        TxEnvelope::Legacy(signed) => match signed.tx().chain_id {
            Some(chain_id) => parity + 35 + 2 * chain_id,
            None => parity + 27,
        },
        _ => parity,
    };

    ChainTransaction {
        hash: *envelope.tx_hash(),
        nonce: envelope.nonce(),
        block_hash: tx.block_hash,
        block_number: tx.block_number,
        transaction_index: tx.transaction_index,
        from: tx.inner.signer(),
        to: envelope.to(),
        value: envelope.value(),
        gas_price: envelope
            .gas_price()
            .or(tx.effective_gas_price)
            .unwrap_or_else(|| envelope.max_fee_per_gas()),
        gas: envelope.gas_limit(),
        input: envelope.input().clone(),
        v,
        r: signature.r(),
        s: signature.s(),
    }
}

fn convert_block(block: &Block) -> ChainBlock {
    let header = &block.header.inner;
    let transactions = match &block.transactions {
        RpcBlockTransactions::Full(txs) => {
            BlockTransactions::Full(txs.iter().map(convert_transaction).collect())
        }
        RpcBlockTransactions::Hashes(hashes) => BlockTransactions::Hashes(hashes.clone()),
        RpcBlockTransactions::Uncle => BlockTransactions::Hashes(Vec::new()),
    };
    ChainBlock {
        number: header.number,
        hash: block.header.hash,
        parent_hash: header.parent_hash,
        timestamp: header.timestamp,
        miner: header.beneficiary,
        gas_used: header.gas_used,
        gas_limit: header.gas_limit,
        base_fee_per_gas: header.base_fee_per_gas,
        transactions,
    }
}

fn convert_log(log: &Log) -> ChainLog {
    ChainLog {
        address: log.inner.address,
        topics: log.inner.data.topics().to_vec(),
        data: log.inner.data.data.clone(),
        block_number: log.block_number,
        block_hash: log.block_hash,
        transaction_hash: log.transaction_hash,
        log_index: log.log_index,
    }
}

fn convert_receipt(receipt: &TransactionReceipt) -> ChainReceipt {
    let (cumulative_gas_used, logs) = receipt
        .inner
        .as_receipt()
        .map(|r| (r.cumulative_gas_used, r.logs.iter().map(convert_log).collect()))
        .unwrap_or_default();
    ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        block_hash: receipt.block_hash,
        block_number: receipt.block_number,
        transaction_index: receipt.transaction_index,
        from: receipt.from,
        to: receipt.to,
        contract_address: receipt.contract_address,
        cumulative_gas_used,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        status: receipt.status(),
        logs,
    }
}

#[async_trait]
impl ChainClient for BlockchainClient {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn get_balance(&self, address: Address, block: BlockSelector) -> ChainResult<U256> {
        let id = block.to_block_id();
        self.with_failover("eth_getBalance", |p| async move {
            p.get_balance(address).block_id(id).await
        })
        .await
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockSelector,
    ) -> ChainResult<u64> {
        let id = block.to_block_id();
        self.with_failover("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).block_id(id).await
        })
        .await
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn get_max_priority_fee(&self) -> ChainResult<u128> {
        self.with_failover("eth_maxPriorityFeePerGas", |p| async move {
            p.get_max_priority_fee_per_gas().await
        })
        .await
    }

    async fn get_block(
        &self,
        selector: BlockSelector,
        full: bool,
    ) -> ChainResult<Option<ChainBlock>> {
        let number = selector.to_number_or_tag();
        let block = self
            .with_failover("eth_getBlockByNumber", |p| async move {
                if full {
                    p.get_block_by_number(number).full().await
                } else {
                    p.get_block_by_number(number).hashes().await
                }
            })
            .await?;
        Ok(block.as_ref().map(convert_block))
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    async fn get_transaction(&self, hash: B256) -> ChainResult<ChainTransaction> {
        let tx = self
            .with_failover("eth_getTransactionByHash", |p| async move {
                p.get_transaction_by_hash(hash).await
            })
            .await?;
        tx.as_ref()
            .map(convert_transaction)
            .ok_or_else(|| ChainError::TransactionNotFound(Some(hash.to_string())))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> ChainResult<Option<ChainReceipt>> {
        let receipt = self
            .with_failover("eth_getTransactionReceipt", |p| async move {
                p.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.as_ref().map(convert_receipt))
    }

    async fn estimate_gas(&self, tx: &CallRequest) -> ChainResult<u64> {
        let request = tx.to_request();
        self.with_failover("eth_estimateGas", |p| {
            let request = request.clone();
            async move { p.estimate_gas(request).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<B256> {
        let raw = raw.to_vec();
        self.with_failover("eth_sendRawTransaction", |p| {
            let raw = raw.clone();
            async move {
                let pending = p.send_raw_transaction(&raw).await?;
                Ok(*pending.tx_hash())
            }
        })
        .await
    }

    async fn call(&self, tx: &CallRequest, block: BlockSelector) -> ChainResult<Bytes> {
        let request = tx.to_request();
        let id = block.to_block_id();
        self.with_failover("eth_call", |p| {
            let request = request.clone();
            async move { p.call(request).block(id).await }
        })
        .await
    }

    async fn get_code(&self, address: Address) -> ChainResult<Bytes> {
        self.with_failover("eth_getCode", |p| async move { p.get_code_at(address).await })
            .await
    }

    async fn get_logs(&self, query: &LogQuery) -> ChainResult<Vec<ChainLog>> {
        let filter = query.to_filter();
        let logs = self
            .with_failover("eth_getLogs", |p| {
                let filter = filter.clone();
                async move { p.get_logs(&filter).await }
            })
            .await?;
        Ok(logs.iter().map(convert_log).collect())
    }

    async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_chain_health(healthy);
        healthy
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BlockchainConfig {
        BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 2,
            ..BlockchainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_client_creation_tolerates_unreachable_node() {
        let result = BlockchainClient::new(test_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = BlockchainClient::new(config).await.unwrap();
        let err = client.get_block_number().await.unwrap_err();
        assert!(matches!(err, ChainError::Rpc(_)));
        assert!(err.to_string().contains("All RPC providers failed"));
        assert!(!client.is_healthy().await);
    }
}
