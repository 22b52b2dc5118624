//! Contract registry, deployment, calls and event queries.

use alloy::dyn_abi::JsonAbiExt;
use alloy::primitives::{Address, Bytes};
use serde_json::{json, Value};

use crate::blockchain::contract::{filter_map, LoadedContract};
use crate::blockchain::format::checksum;
use crate::blockchain::types::{BlockSelector, BlockTag, CallRequest, LogQuery};
use crate::dispatch::handlers::transaction::{submit, Outgoing};
use crate::dispatch::{Call, Services};
use crate::errors::api::ApiError;
use crate::errors::failure::HandlerResult;
use crate::validation::abi::{bind_constructor_args, build_event_topics, decode_function_output};
use crate::validation::schema::{missing, ValidatedParams};

fn args(params: &ValidatedParams) -> Vec<Value> {
    match params.json("args") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn contract(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<LoadedContract> {
    let address = params
        .address("contractAddress")
        .ok_or_else(|| missing("contractAddress"))?;
    call.note("contract_address", checksum(address));
    Ok(services.contracts.require(address)?)
}

fn method<'a>(call: &Call, params: &'a ValidatedParams) -> HandlerResult<&'a str> {
    let method = params.text("method").ok_or_else(|| missing("method"))?;
    call.note("method_name", method);
    Ok(method)
}

fn encoding_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::invalid_parameters("args", &format!("Failed to encode arguments: {}", e))
}

pub(super) fn load(services: &Services, params: &ValidatedParams) -> HandlerResult<Value> {
    let address = params.address("address").ok_or_else(|| missing("address"))?;
    let abi = params.abi("abi").ok_or_else(|| missing("abi"))?;
    let contract = services
        .contracts
        .load(address, abi.clone(), params.text("name").map(str::to_string));
    Ok(contract.summary())
}

pub(super) fn list(services: &Services) -> Value {
    json!({ "contracts": services.contracts.list() })
}

/// Broadcast the creation transaction. The contract is registered at the
/// address derived from sender and nonce without waiting for the receipt.
pub(super) async fn deploy(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let from = params.address("from").ok_or_else(|| missing("from"))?;
    let bytecode = params.bytes("bytecode").ok_or_else(|| missing("bytecode"))?;
    let abi = params.abi("abi").ok_or_else(|| missing("abi"))?;

    let values = bind_constructor_args(&abi.abi, &args(params))
        .map_err(|e| ApiError::invalid_parameters("args", e.message()))?;
    let mut data = bytecode.to_vec();
    if let Some(constructor) = &abi.abi.constructor {
        data.extend(constructor.abi_encode_input(&values).map_err(encoding_error)?);
    }

    let tx = Outgoing {
        data: Some(Bytes::from(data)),
        ..Outgoing::from_params(from, params)
    };
    let submitted = submit(services, call, tx).await?;

    let address: Address = from.create(submitted.nonce);
    services.contracts.load(address, abi.clone(), None);
    Ok(json!({
        "transactionHash": submitted.hash.to_string(),
        "contractAddress": checksum(address),
    }))
}

pub(super) async fn call(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let contract = contract(services, call, params)?;
    let method = method(call, params)?;
    let from = params.address("from").ok_or_else(|| missing("from"))?;

    let (function, values) = contract.bind(method, &args(params))?;
    let data = function.abi_encode_input(&values).map_err(encoding_error)?;

    let tx = Outgoing {
        to: Some(contract.address),
        data: Some(Bytes::from(data)),
        ..Outgoing::from_params(from, params)
    };
    let submitted = submit(services, call, tx).await?;
    Ok(json!({
        "transactionHash": submitted.hash.to_string(),
        "contractAddress": checksum(contract.address),
        "method": function.name,
    }))
}

pub(super) async fn read(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let contract = contract(services, call, params)?;
    let method = method(call, params)?;
    let block = params.block("block").unwrap_or(BlockSelector::LATEST);

    let (function, values) = contract.bind(method, &args(params))?;
    let data = function.abi_encode_input(&values).map_err(encoding_error)?;

    let request = CallRequest {
        to: Some(contract.address),
        data: Some(Bytes::from(data)),
        ..Default::default()
    };
    let output = services.chain.call(&request, block).await?;
    let result = decode_function_output(&function, &output)
        .map_err(|e| ApiError::internal(e.message().to_string()))?;
    Ok(json!({ "result": result }))
}

/// `fromBlock` defaults to genesis and `toBlock` to latest.
pub(super) async fn events(services: &Services, call: &Call, params: &ValidatedParams) -> HandlerResult<Value> {
    let contract = contract(services, call, params)?;
    let name = params.text("eventName").ok_or_else(|| missing("eventName"))?;
    let event = contract.event(name)?;

    let topics = build_event_topics(event, &filter_map(params.json("filters")))
        .map_err(|e| ApiError::invalid_parameters("filters", e.message()))?;
    let query = LogQuery {
        address: contract.address,
        from_block: params
            .block("fromBlock")
            .unwrap_or(BlockSelector::Tag(BlockTag::Earliest)),
        to_block: params.block("toBlock").unwrap_or(BlockSelector::LATEST),
        topics,
    };

    let logs = services.chain.get_logs(&query).await?;
    let events = logs
        .iter()
        .map(|log| contract.decode_log(event, log))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        request_id = %call.request_id(),
        event = %event.name,
        found = events.len(),
        "Events fetched"
    );
    Ok(json!({ "events": events }))
}
