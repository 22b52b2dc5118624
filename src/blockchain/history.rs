//! Address transaction history by block scanning.
//!
//! Nodes have no "transactions by address" call, so history walks the block
//! range and filters full transactions. The monitor uses [`scan_mined_block`] so
//! both producers emit identical records.

use std::collections::VecDeque;
use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::stream::{self, Stream};

use crate::blockchain::chain::ChainClient;
use crate::blockchain::format::FormattedTransaction;
use crate::blockchain::types::{BlockSelector, ChainError, ChainResult};
use crate::errors::api::ApiError;
use crate::errors::failure::HandlerResult;

/// Inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    /// Number of blocks covered.
    pub fn span(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }
}

/// Fill in missing bounds and enforce `max_range`.
///
/// `end` defaults to the chain head. `start` defaults to the widest window
/// ending at `end` that `max_range` allows.
pub async fn resolve_range(
    chain: &dyn ChainClient,
    start: Option<u64>,
    end: Option<u64>,
    max_range: u64,
) -> HandlerResult<BlockRange> {
    let end = match end {
        Some(end) => end,
        None => chain.get_block_number().await?,
    };
    let start = start.unwrap_or_else(|| end.saturating_sub(max_range.saturating_sub(1)));

    if start > end {
        return Err(ApiError::invalid_parameters(
            "startBlock",
            &format!("startBlock ({}) must not exceed endBlock ({})", start, end),
        )
        .into());
    }

    let range = BlockRange { start, end };
    if range.span() > max_range {
        return Err(ApiError::invalid_parameters(
            "endBlock",
            &format!(
                "Block range of {} exceeds maximum of {}",
                range.span(),
                max_range
            ),
        )
        .into());
    }
    Ok(range)
}

/// Transactions in block `number` sent from or to `address`, in index order.
/// A block the node does not have yields nothing.
pub async fn scan_block(
    chain: &dyn ChainClient,
    address: Address,
    number: u64,
) -> ChainResult<Vec<FormattedTransaction>> {
    Ok(matching(chain, address, number).await?.unwrap_or_default())
}

/// As [`scan_block`], for a block at or below the reported head: a block the
/// node cannot serve yet is an error, so callers retry it instead of
/// skipping it.
pub async fn scan_mined_block(
    chain: &dyn ChainClient,
    address: Address,
    number: u64,
) -> ChainResult<Vec<FormattedTransaction>> {
    matching(chain, address, number)
        .await?
        .ok_or(ChainError::BlockUnavailable(number))
}

async fn matching(
    chain: &dyn ChainClient,
    address: Address,
    number: u64,
) -> ChainResult<Option<Vec<FormattedTransaction>>> {
    let Some(block) = chain.get_block(BlockSelector::Number(number), true).await? else {
        tracing::debug!(block = number, "Block not available");
        return Ok(None);
    };
    Ok(Some(
        block
            .full_transactions()
            .iter()
            .filter(|tx| tx.touches(address))
            .map(|tx| FormattedTransaction::from_chain(tx, Some(block.timestamp)))
            .collect(),
    ))
}

/// Every matching transaction in `range`, ordered by block then index.
pub async fn collect_history(
    chain: &dyn ChainClient,
    address: Address,
    range: BlockRange,
) -> ChainResult<Vec<FormattedTransaction>> {
    let mut transactions = Vec::new();
    for number in range.start..=range.end {
        transactions.extend(scan_block(chain, address, number).await?);
    }
    tracing::debug!(
        address = %address,
        start = range.start,
        end = range.end,
        found = transactions.len(),
        "History scanned"
    );
    Ok(transactions)
}

struct StreamState {
    chain: Arc<dyn ChainClient>,
    address: Address,
    next: u64,
    end: u64,
    buffer: VecDeque<FormattedTransaction>,
    done: bool,
}

/// Lazily scan `range`, one block at a time. The stream ends after the first
/// error.
pub fn stream_history(
    chain: Arc<dyn ChainClient>,
    address: Address,
    range: BlockRange,
) -> impl Stream<Item = ChainResult<FormattedTransaction>> + Send {
    let state = StreamState {
        chain,
        address,
        next: range.start,
        end: range.end,
        buffer: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(tx) = state.buffer.pop_front() {
                return Some((Ok(tx), state));
            }
            if state.done || state.next > state.end {
                return None;
            }
            let number = state.next;
            match number.checked_add(1) {
                Some(next) => state.next = next,
                None => state.done = true,
            }
            match scan_block(state.chain.as_ref(), state.address, number).await {
                Ok(found) => state.buffer.extend(found),
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            }
        }
    })
}
