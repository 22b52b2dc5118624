//! Registry of contracts the gateway can call.

use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::{Event, Function};
use alloy::primitives::Address;
use dashmap::DashMap;
use serde_json::{json, Map, Value};

use crate::blockchain::format::checksum;
use crate::blockchain::types::ChainLog;
use crate::errors::api::{ApiError, ApiResult};
use crate::validation::abi::{bind_function_args, decode_event_log, ParsedAbi};

/// A contract with its parsed ABI.
#[derive(Debug, Clone)]
pub struct LoadedContract {
    pub name: String,
    pub address: Address,
    pub abi: ParsedAbi,
}

impl LoadedContract {
    /// Resolve `method` and bind `args`. Unknown names are
    /// `METHOD_NOT_FOUND`; argument problems are `INVALID_PARAMETERS`.
    pub fn bind(&self, method: &str, args: &[Value]) -> ApiResult<(Function, Vec<DynSolValue>)> {
        let overloads = self
            .abi
            .abi
            .function(method)
            .ok_or_else(|| ApiError::method_not_found(method, &checksum(self.address)))?;
        let (function, values) = bind_function_args(overloads, args)
            .map_err(|e| ApiError::invalid_parameters("args", e.message()))?;
        Ok((function.clone(), values))
    }

    pub fn event(&self, name: &str) -> ApiResult<&Event> {
        self.abi
            .abi
            .event(name)
            .and_then(|events| events.first())
            .ok_or_else(|| {
                ApiError::invalid_parameters(
                    "eventName",
                    &format!("Event '{}' not found in contract ABI", name),
                )
            })
    }

    /// `{event, args, blockNumber, transactionHash, address, logIndex}`.
    pub fn decode_log(&self, event: &Event, log: &ChainLog) -> ApiResult<Value> {
        let args = decode_event_log(event, log.topics.clone(), log.data.clone())
            .map_err(|e| ApiError::internal(e.message().to_string()))?;
        Ok(json!({
            "event": event.name,
            "args": Value::Object(args),
            "blockNumber": log.block_number,
            "transactionHash": log.transaction_hash.map(|h| h.to_string()),
            "address": checksum(log.address),
            "logIndex": log.log_index,
        }))
    }

    /// Decode whichever receipt logs match an event of this ABI; others are
    /// skipped.
    pub fn decode_receipt_logs(&self, logs: &[ChainLog]) -> Vec<Value> {
        logs.iter()
            .filter(|log| log.address == self.address)
            .filter_map(|log| {
                let topic0 = log.topics.first()?;
                let event = self
                    .abi
                    .abi
                    .events()
                    .find(|e| !e.anonymous && e.selector() == *topic0)?;
                self.decode_log(event, log).ok()
            })
            .collect()
    }

    pub fn summary(&self) -> Value {
        json!({
            "name": self.name,
            "address": checksum(self.address),
            "functions": self.abi.function_names(),
            "events": self.abi.event_names(),
        })
    }
}

/// Loaded contracts keyed by address.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: Arc<DashMap<Address, LoadedContract>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the contract at `address`. `name` defaults to the
    /// checksummed address.
    pub fn load(&self, address: Address, abi: ParsedAbi, name: Option<String>) -> LoadedContract {
        let contract = LoadedContract {
            name: name.unwrap_or_else(|| checksum(address)),
            address,
            abi,
        };
        self.contracts.insert(address, contract.clone());
        tracing::info!(
            contract = %contract.name,
            address = %checksum(address),
            "Contract loaded"
        );
        contract
    }

    pub fn get(&self, address: Address) -> Option<LoadedContract> {
        self.contracts.get(&address).map(|c| c.value().clone())
    }

    pub fn require(&self, address: Address) -> ApiResult<LoadedContract> {
        self.get(address)
            .ok_or_else(|| ApiError::contract_not_found(&checksum(address)))
    }

    /// Summaries sorted by name.
    pub fn list(&self) -> Vec<Value> {
        let mut contracts: Vec<LoadedContract> =
            self.contracts.iter().map(|c| c.value().clone()).collect();
        contracts.sort_by(|a, b| a.name.cmp(&b.name));
        contracts.iter().map(LoadedContract::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Named filter map from `contract_getEvents`, empty when absent.
pub fn filter_map(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}
