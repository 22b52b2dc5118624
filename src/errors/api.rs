//! Structured error envelope returned to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::kind::ErrorKind;

/// A single `field: reason` pair from composed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Taxonomy error.
///
/// Immutable once built: every constructor stamps a fresh request id and a
/// UTC timestamp, and the only way to add details afterwards is
/// [`ApiError::with_detail`], which the normalizer uses while constructing.
#[derive(Debug, Clone, Serialize, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    code: ErrorKind,
    message: String,
    details: Map<String, Value>,
    request_id: Uuid,
    timestamp: DateTime<Utc>,
}

pub type ApiResult<T> = Result<T, ApiError>;

fn details(pairs: Vec<(&str, Value)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    pub fn wallet_not_found(wallet_name: &str) -> Self {
        Self::new(
            ErrorKind::WalletNotFound,
            format!("Wallet '{}' not found", wallet_name),
            details(vec![("wallet_name", json!(wallet_name))]),
        )
    }

    pub fn wallet_already_exists(wallet_name: &str) -> Self {
        Self::new(
            ErrorKind::WalletAlreadyExists,
            format!("Wallet '{}' already exists", wallet_name),
            details(vec![("wallet_name", json!(wallet_name))]),
        )
    }

    pub fn invalid_address(address: &str, reason: Option<&str>) -> Self {
        Self::new(
            ErrorKind::InvalidAddress,
            format!("Invalid Ethereum address: {}", address),
            details(vec![("address", json!(address)), ("reason", json!(reason))]),
        )
    }

    pub fn invalid_private_key(reason: Option<&str>) -> Self {
        Self::new(
            ErrorKind::InvalidPrivateKey,
            "Invalid private key",
            details(vec![("reason", json!(reason))]),
        )
    }

    pub fn insufficient_funds(required: &str, available: &str, address: &str) -> Self {
        Self::new(
            ErrorKind::InsufficientFunds,
            "Insufficient funds for transaction",
            details(vec![
                ("required", json!(required)),
                ("available", json!(available)),
                ("address", json!(address)),
            ]),
        )
    }

    pub fn nonce_too_low(provided_nonce: u64, expected_nonce: u64) -> Self {
        Self::new(
            ErrorKind::NonceTooLow,
            format!(
                "Nonce too low: provided {}, expected {}",
                provided_nonce, expected_nonce
            ),
            details(vec![
                ("provided_nonce", json!(provided_nonce)),
                ("expected_nonce", json!(expected_nonce)),
            ]),
        )
    }

    pub fn gas_too_low(provided_gas: u64, required_gas: u64) -> Self {
        Self::new(
            ErrorKind::GasTooLow,
            format!(
                "Gas limit too low: provided {}, required at least {}",
                provided_gas, required_gas
            ),
            details(vec![
                ("provided_gas", json!(provided_gas)),
                ("required_gas", json!(required_gas)),
            ]),
        )
    }

    pub fn transaction_failed(tx_hash: &str, reason: &str) -> Self {
        Self::new(
            ErrorKind::TransactionFailed,
            format!("Transaction failed: {}", reason),
            details(vec![
                ("transaction_hash", json!(tx_hash)),
                ("reason", json!(reason)),
            ]),
        )
    }

    pub fn transaction_not_found(tx_hash: &str) -> Self {
        Self::new(
            ErrorKind::TransactionNotFound,
            format!("Transaction not found: {}", tx_hash),
            details(vec![("transaction_hash", json!(tx_hash))]),
        )
    }

    pub fn contract_not_found(address: &str) -> Self {
        Self::new(
            ErrorKind::ContractNotFound,
            format!("Contract not found at address: {}", address),
            details(vec![("contract_address", json!(address))]),
        )
    }

    pub fn method_not_found(method_name: &str, contract_address: &str) -> Self {
        Self::new(
            ErrorKind::MethodNotFound,
            format!("Method '{}' not found in contract", method_name),
            details(vec![
                ("method_name", json!(method_name)),
                ("contract_address", json!(contract_address)),
            ]),
        )
    }

    pub fn invalid_abi(reason: &str) -> Self {
        Self::new(
            ErrorKind::InvalidAbi,
            format!("Invalid contract ABI: {}", reason),
            details(vec![("reason", json!(reason))]),
        )
    }

    pub fn invalid_parameters(parameter_name: &str, reason: &str) -> Self {
        Self::new(
            ErrorKind::InvalidParameters,
            format!("Invalid parameter '{}': {}", parameter_name, reason),
            details(vec![
                ("parameter_name", json!(parameter_name)),
                ("reason", json!(reason)),
            ]),
        )
    }

    /// Aggregate of every failed field of a composed schema.
    pub fn invalid_parameter_set(errors: &[FieldError]) -> Self {
        let summary = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.reason))
            .collect::<Vec<_>>()
            .join("; ");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        Self::new(
            ErrorKind::InvalidParameters,
            format!("Validation failed: {}", summary),
            details(vec![
                ("parameter_name", json!(fields.join(", "))),
                ("errors", json!(errors)),
            ]),
        )
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            ErrorKind::InvalidParameters,
            format!("Unsupported method: {}", method),
            details(vec![
                ("parameter_name", json!("method")),
                ("reason", json!("unknown operation")),
                ("method", json!(method)),
            ]),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message, Map::new())
    }

    pub fn rate_limited(retry_after: u64, limit: u64, window: &str, remaining: u64) -> Self {
        Self::new(
            ErrorKind::RateLimited,
            "Rate limit exceeded",
            details(vec![
                ("retry_after", json!(retry_after)),
                ("limit", json!(limit)),
                ("window", json!(window)),
                ("remaining", json!(remaining)),
            ]),
        )
    }

    /// Construction-time enrichment. Consumes the value so an error that has
    /// been handed out can no longer change.
    pub(crate) fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `{code, message, details}` as placed under `error` in a response.
    pub fn to_body(&self) -> Value {
        json!({
            "code": self.code,
            "message": self.message,
            "details": self.details,
        })
    }

    /// Full standalone form including request id and timestamp.
    pub fn to_dict(&self) -> Value {
        json!({ "error": self })
    }
}
