//! Transaction submission and receipts.
//!
//! Every signed submission passes the same pre-flight: the sender must be a
//! managed wallet, an explicit nonce may not be below the chain nonce, an
//! explicit gas limit may not be below the node's estimate, and the balance
//! must cover `value + gas * gasPrice`.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};

use crate::blockchain::format::{checksum, format_receipt};
use crate::blockchain::types::{BlockSelector, CallRequest};
use crate::dispatch::{Call, Services};
use crate::errors::api::ApiError;
use crate::errors::failure::HandlerResult;
use crate::validation::schema::{missing, ValidatedParams};

/// A transaction the gateway will sign for a managed wallet.
#[derive(Debug, Clone, Default)]
pub(super) struct Outgoing {
    pub from: Address,
    /// `None` deploys `data` as a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Option<Bytes>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl Outgoing {
    pub fn from_params(from: Address, params: &ValidatedParams) -> Self {
        Self {
            from,
            to: None,
            value: params.uint("value").unwrap_or(U256::ZERO),
            data: None,
            gas: params.u64("gas"),
            gas_price: params.u128("gasPrice"),
            nonce: params.u64("nonce"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Submitted {
    pub hash: B256,
    pub nonce: u64,
}

/// Pre-flight, sign and broadcast.
pub(super) async fn submit(services: &Services, call: &Call, tx: Outgoing) -> HandlerResult<Submitted> {
    let chain = services.chain.as_ref();
    let wallet = services.wallets.require(tx.from)?;
    call.note("address", checksum(tx.from));

    let expected_nonce = chain
        .get_transaction_count(tx.from, BlockSelector::PENDING)
        .await?;
    let nonce = match tx.nonce {
        Some(provided) if provided < expected_nonce => {
            return Err(ApiError::nonce_too_low(provided, expected_nonce).into())
        }
        Some(provided) => provided,
        None => expected_nonce,
    };
    call.note("nonce", nonce);

    let mut request = CallRequest {
        from: Some(tx.from),
        to: tx.to,
        value: Some(tx.value),
        data: tx.data,
        gas: None,
        gas_price: None,
        nonce: Some(nonce),
        chain_id: Some(services.chain_id()),
    };

    let estimate = chain.estimate_gas(&request).await?;
    let gas = match tx.gas {
        Some(provided) if provided < estimate => {
            return Err(ApiError::gas_too_low(provided, estimate).into())
        }
        Some(provided) => provided,
        None => estimate,
    };
    call.note("gas", gas);

    let gas_price = match tx.gas_price {
        Some(price) => price,
        None => chain.get_gas_price().await?,
    };

    let required = tx
        .value
        .saturating_add(U256::from(gas).saturating_mul(U256::from(gas_price)));
    let available = chain.get_balance(tx.from, BlockSelector::PENDING).await?;
    if available < required {
        return Err(ApiError::insufficient_funds(
            &required.to_string(),
            &available.to_string(),
            &checksum(tx.from),
        )
        .into());
    }

    request.gas = Some(gas);
    request.gas_price = Some(gas_price);
    let raw = wallet.sign_transaction(request.to_request()).await?;
    let hash = chain.send_raw_transaction(&raw).await?;
    call.note("tx_hash", hash.to_string());

    tracing::info!(
        request_id = %call.request_id(),
        from = %checksum(tx.from),
        to = ?tx.to.map(checksum),
        nonce,
        gas,
        tx_hash = %hash,
        "Transaction submitted"
    );
    Ok(Submitted { hash, nonce })
}

pub(super) async fn estimate_gas(services: &Services, params: &ValidatedParams) -> HandlerResult<Value> {
    let request = CallRequest {
        from: params.address("from"),
        to: params.address("to"),
        value: params.uint("value"),
        data: params.bytes("data"),
        ..Default::default()
    };
    let gas = services.chain.estimate_gas(&request).await?;
    Ok(json!({ "gas": gas }))
}

pub(super) async fn send(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let from = params.address("from").ok_or_else(|| missing("from"))?;
    let tx = Outgoing {
        to: params.address("to"),
        data: params.bytes("data"),
        ..Outgoing::from_params(from, params)
    };
    let submitted = submit(services, call, tx).await?;
    Ok(json!({
        "transactionHash": submitted.hash.to_string(),
        "nonce": submitted.nonce,
    }))
}

pub(super) async fn send_raw(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let raw = params
        .bytes("signedTransaction")
        .ok_or_else(|| missing("signedTransaction"))?;
    if raw.is_empty() {
        return Err(ApiError::invalid_parameters("signedTransaction", "Signed transaction cannot be empty").into());
    }
    let hash = services.chain.send_raw_transaction(&raw).await?;
    call.note("tx_hash", hash.to_string());
    tracing::info!(request_id = %call.request_id(), tx_hash = %hash, "Raw transaction submitted");
    Ok(json!({ "transactionHash": hash.to_string() }))
}

/// A mined receipt with status 0 is a failure, not a result.
pub(super) async fn wait_for_receipt(
    services: &Services,
    call: &Call,
    params: &ValidatedParams,
) -> HandlerResult<Value> {
    let hash = params.hash("hash").ok_or_else(|| missing("hash"))?;
    call.note("tx_hash", hash.to_string());

    let limits = services.limits;
    let wait = params
        .u64("timeoutSecs")
        .map(std::time::Duration::from_secs)
        .unwrap_or(limits.receipt_timeout);
    let receipt = services
        .chain
        .wait_for_receipt(hash, wait, limits.receipt_poll_interval)
        .await?;

    if !receipt.status {
        return Err(ApiError::transaction_failed(&hash.to_string(), "Transaction reverted").into());
    }
    Ok(format_receipt(&receipt))
}
