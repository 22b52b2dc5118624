//! Shared fixtures for integration tests: an in-memory chain and helpers to
//! fill it with blocks and transactions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use eth_rpc_gateway::blockchain::types::{
    BlockSelector, BlockTag, BlockTransactions, CallRequest, ChainBlock, ChainError, ChainLog,
    ChainReceipt, ChainResult, ChainTransaction, LogQuery,
};
use eth_rpc_gateway::blockchain::ChainClient;
use eth_rpc_gateway::dispatch::{Limits, Services};
use eth_rpc_gateway::Dispatcher;

pub const CHAIN_ID: u64 = 1337;

/// A well-known development key.
pub const DEV_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

#[derive(Default)]
struct State {
    head: u64,
    blocks: HashMap<u64, Vec<ChainTransaction>>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<B256, ChainReceipt>,
    sent: Vec<Bytes>,
    gas_estimate: u64,
    gas_price: u128,
    base_fee: Option<u64>,
    unreachable: bool,
    panic_on_gas_price: bool,
}

/// Programmable in-memory node.
pub struct MockChain {
    state: Mutex<State>,
    failing_heads: AtomicU32,
    failing_blocks: AtomicU32,
    hidden_blocks: AtomicU32,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                head: 100,
                gas_estimate: 21_000,
                gas_price: 2_000_000_000,
                base_fee: Some(1_000_000_000),
                ..Default::default()
            }),
            failing_heads: AtomicU32::new(0),
            failing_blocks: AtomicU32::new(0),
            hidden_blocks: AtomicU32::new(0),
        })
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    /// Put `txs` into block `number` (stamped with block data) and move the
    /// head forward to it if needed.
    pub fn mine(&self, number: u64, txs: Vec<ChainTransaction>) {
        let mut state = self.state.lock().unwrap();
        let txs = txs
            .into_iter()
            .enumerate()
            .map(|(i, mut tx)| {
                tx.block_number = Some(number);
                tx.block_hash = Some(block_hash(number));
                tx.transaction_index = Some(i as u64);
                tx
            })
            .collect();
        state.blocks.insert(number, txs);
        state.head = state.head.max(number);
    }

    pub fn set_balance(&self, address: Address, wei: U256) {
        self.state.lock().unwrap().balances.insert(address, wei);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, nonce);
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.state.lock().unwrap().gas_estimate = gas;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn panic_on_gas_price(&self) {
        self.state.lock().unwrap().panic_on_gas_price = true;
    }

    pub fn add_receipt(&self, receipt: ChainReceipt) {
        self.state
            .lock()
            .unwrap()
            .receipts
            .insert(receipt.transaction_hash, receipt);
    }

    /// The next `n` head reads fail with an RPC error.
    pub fn fail_next_heads(&self, n: u32) {
        self.failing_heads.store(n, Ordering::SeqCst);
    }

    /// The next `n` block reads fail with an RPC error.
    pub fn fail_next_blocks(&self, n: u32) {
        self.failing_blocks.store(n, Ordering::SeqCst);
    }

    /// The next `n` block fetches report the block as not found.
    pub fn hide_next_blocks(&self, n: u32) {
        self.hidden_blocks.store(n, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_reachable(&self) -> ChainResult<()> {
        if self.state.lock().unwrap().unreachable {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }

    fn resolve(&self, selector: BlockSelector) -> u64 {
        let state = self.state.lock().unwrap();
        match selector {
            BlockSelector::Number(n) => n,
            BlockSelector::Tag(BlockTag::Earliest) => 0,
            BlockSelector::Tag(_) => state.head,
        }
    }
}

pub fn block_hash(number: u64) -> B256 {
    keccak256(number.to_be_bytes())
}

/// A plain value transfer. `seed` makes the hash unique.
pub fn transfer(seed: u64, from: Address, to: Address, wei: u64) -> ChainTransaction {
    ChainTransaction {
        hash: keccak256(format!("tx-{}", seed)),
        nonce: seed,
        block_hash: None,
        block_number: None,
        transaction_index: None,
        from,
        to: Some(to),
        value: U256::from(wei),
        gas_price: 1_000_000_000,
        gas: 21_000,
        input: Bytes::new(),
        v: 27,
        r: U256::from(1u8),
        s: U256::from(2u8),
    }
}

pub fn receipt(hash: B256, status: bool) -> ChainReceipt {
    ChainReceipt {
        transaction_hash: hash,
        block_hash: Some(block_hash(7)),
        block_number: Some(7),
        transaction_index: Some(0),
        from: Address::repeat_byte(0x01),
        to: Some(Address::repeat_byte(0x02)),
        contract_address: None,
        cumulative_gas_used: 21_000,
        gas_used: 21_000,
        effective_gas_price: 1_000_000_000,
        status,
        logs: Vec::new(),
    }
}

/// Dispatcher over `chain` with short receipt waits.
pub fn dispatcher(chain: Arc<MockChain>, debug: bool) -> Dispatcher {
    let limits = Limits {
        receipt_timeout: Duration::from_millis(200),
        receipt_poll_interval: Duration::from_millis(10),
        max_history_range: 100,
        max_stream_batch: 50,
    };
    Dispatcher::new(Services::new(chain, limits), debug)
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    async fn get_balance(&self, address: Address, _block: BlockSelector) -> ChainResult<U256> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn get_transaction_count(&self, address: Address, _block: BlockSelector) -> ChainResult<u64> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        self.check_reachable()?;
        let (price, panics) = {
            let state = self.state.lock().unwrap();
            (state.gas_price, state.panic_on_gas_price)
        };
        if panics {
            panic!("gas oracle exploded");
        }
        Ok(price)
    }

    async fn get_max_priority_fee(&self) -> ChainResult<u128> {
        self.check_reachable()?;
        Ok(100_000_000)
    }

    async fn get_block(&self, selector: BlockSelector, full: bool) -> ChainResult<Option<ChainBlock>> {
        self.check_reachable()?;
        if Self::take_failure(&self.failing_blocks) {
            return Err(ChainError::Rpc("block fetch failed".to_string()));
        }
        if Self::take_failure(&self.hidden_blocks) {
            return Ok(None);
        }
        let number = self.resolve(selector);
        let state = self.state.lock().unwrap();
        if number > state.head {
            return Ok(None);
        }
        let txs = state.blocks.get(&number).cloned().unwrap_or_default();
        let transactions = if full {
            BlockTransactions::Full(txs)
        } else {
            BlockTransactions::Hashes(txs.iter().map(|tx| tx.hash).collect())
        };
        Ok(Some(ChainBlock {
            number,
            hash: block_hash(number),
            parent_hash: block_hash(number.saturating_sub(1)),
            timestamp: 1_700_000_000 + number * 12,
            miner: Address::ZERO,
            gas_used: 0,
            gas_limit: 30_000_000,
            base_fee_per_gas: state.base_fee,
            transactions,
        }))
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.check_reachable()?;
        if Self::take_failure(&self.failing_heads) {
            return Err(ChainError::Rpc("head fetch failed".to_string()));
        }
        Ok(self.head())
    }

    async fn get_transaction(&self, hash: B256) -> ChainResult<ChainTransaction> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        state
            .blocks
            .values()
            .flatten()
            .find(|tx| tx.hash == hash)
            .cloned()
            .ok_or_else(|| ChainError::TransactionNotFound(Some(hash.to_string())))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> ChainResult<Option<ChainReceipt>> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }

    async fn estimate_gas(&self, _tx: &CallRequest) -> ChainResult<u64> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().gas_estimate)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<B256> {
        self.check_reachable()?;
        let bytes = Bytes::copy_from_slice(raw);
        let hash = keccak256(&bytes);
        self.state.lock().unwrap().sent.push(bytes);
        Ok(hash)
    }

    async fn call(&self, _tx: &CallRequest, _block: BlockSelector) -> ChainResult<Bytes> {
        self.check_reachable()?;
        Ok(Bytes::new())
    }

    async fn get_code(&self, _address: Address) -> ChainResult<Bytes> {
        self.check_reachable()?;
        Ok(Bytes::new())
    }

    async fn get_logs(&self, _query: &LogQuery) -> ChainResult<Vec<ChainLog>> {
        self.check_reachable()?;
        Ok(Vec::new())
    }
}
