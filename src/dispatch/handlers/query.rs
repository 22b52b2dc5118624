//! Read-only chain queries.

use alloy::primitives::Address;
use serde_json::{json, Value};

use crate::blockchain::format::{checksum, format_block, format_receipt, FormattedTransaction};
use crate::blockchain::history::{collect_history, resolve_range};
use crate::blockchain::types::BlockSelector;
use crate::dispatch::{Call, Services};
use crate::errors::api::ApiError;
use crate::errors::failure::HandlerResult;
use crate::validation::schema::{missing, ValidatedParams};

/// Multipliers of the priority fee for slow, standard, fast and instant.
const PRIORITY_TIERS: [(&str, u128); 4] = [("slow", 1), ("standard", 2), ("fast", 3), ("instant", 4)];

fn address(call: &Call, params: &ValidatedParams, field: &str) -> HandlerResult<Address> {
    let address = params.address(field).ok_or_else(|| missing(field))?;
    call.note("address", checksum(address));
    Ok(address)
}

pub(super) async fn balance(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let address = address(call, params, "address")?;
    let block = params.block("block").unwrap_or(BlockSelector::LATEST);
    let balance = services.chain.get_balance(address, block).await?;
    Ok(json!({
        "address": checksum(address),
        "balance": balance.to_string(),
        "block": block.to_json(),
    }))
}

pub(super) async fn transaction_count(
    services: &Services,
    call: &Call,
    params: &ValidatedParams,
) -> HandlerResult<Value> {
    let address = address(call, params, "address")?;
    let block = params.block("block").unwrap_or(BlockSelector::LATEST);
    let count = services.chain.get_transaction_count(address, block).await?;
    Ok(json!({
        "address": checksum(address),
        "count": count,
        "block": block.to_json(),
    }))
}

pub(super) async fn block_number(services: &Services) -> HandlerResult<Value> {
    let number = services.chain.get_block_number().await?;
    Ok(json!({ "blockNumber": number }))
}

pub(super) async fn block(services: &Services, params: &ValidatedParams) -> HandlerResult<Value> {
    let selector = params.block("block").ok_or_else(|| missing("block"))?;
    let full = params.bool("fullTransactions").unwrap_or(false);
    match services.chain.get_block(selector, full).await? {
        Some(block) => Ok(format_block(&block)),
        None => Err(ApiError::invalid_parameters("block", &format!("Block {} not found", selector)).into()),
    }
}

pub(super) async fn gas_price(services: &Services) -> HandlerResult<Value> {
    let price = services.chain.get_gas_price().await?;
    Ok(json!({ "gasPrice": price.to_string() }))
}

/// Latest base fee plus one to four times the suggested priority fee.
/// Chains without a base fee fall back to the legacy gas price.
pub(super) async fn gas_price_estimate(services: &Services) -> HandlerResult<Value> {
    let latest = services.chain.get_block(BlockSelector::LATEST, false).await?;
    let base_fee = match latest.and_then(|b| b.base_fee_per_gas) {
        Some(fee) => u128::from(fee),
        None => services.chain.get_gas_price().await?,
    };
    let priority = services.chain.get_max_priority_fee().await?;

    let mut estimate = serde_json::Map::new();
    for (tier, multiplier) in PRIORITY_TIERS {
        let price = base_fee.saturating_add(priority.saturating_mul(multiplier));
        estimate.insert(tier.to_string(), json!(price.to_string()));
    }
    estimate.insert("baseFee".to_string(), json!(base_fee.to_string()));
    Ok(Value::Object(estimate))
}

pub(super) async fn transaction(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let hash = params.hash("hash").ok_or_else(|| missing("hash"))?;
    call.note("tx_hash", hash.to_string());

    let tx = services.chain.get_transaction(hash).await?;
    let timestamp = match tx.block_number {
        Some(number) => services
            .chain
            .get_block(BlockSelector::Number(number), false)
            .await?
            .map(|b| b.timestamp),
        None => None,
    };
    Ok(json!(FormattedTransaction::from_chain(&tx, timestamp)))
}

/// Receipt logs are decoded too when the recipient is a loaded contract.
pub(super) async fn receipt(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let hash = params.hash("hash").ok_or_else(|| missing("hash"))?;
    call.note("tx_hash", hash.to_string());

    let receipt = services
        .chain
        .get_transaction_receipt(hash)
        .await?
        .ok_or_else(|| ApiError::transaction_not_found(&hash.to_string()))?;

    let mut value = format_receipt(&receipt);
    if let Some(contract) = receipt.to.and_then(|to| services.contracts.get(to)) {
        value["decodedLogs"] = json!(contract.decode_receipt_logs(&receipt.logs));
    }
    Ok(value)
}

pub(super) async fn history(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let address = address(call, params, "address")?;
    let range = resolve_range(
        services.chain.as_ref(),
        params.u64("startBlock"),
        params.u64("endBlock"),
        services.limits.max_history_range,
    )
    .await?;

    let transactions = collect_history(services.chain.as_ref(), address, range).await?;
    Ok(json!({
        "address": checksum(address),
        "startBlock": range.start,
        "endBlock": range.end,
        "count": transactions.len(),
        "transactions": transactions,
    }))
}
