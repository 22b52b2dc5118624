//! Input validation.
//!
//! # Data Flow
//! ```text
//! raw JSON params
//!     → schema.rs (per-operation field rules, every failure collected)
//!     → address.rs / keys.rs / hex.rs / numeric.rs / block.rs (pure checks)
//!     → abi.rs (ABI structure, argument binding, event filters)
//!     → ValidatedParams (normalized, typed values)
//! ```
//!
//! Validators are pure and synchronous. Each one fails fast with a message
//! naming the defect; composition into one error happens in `schema`.

pub mod abi;
pub mod address;
pub mod block;
pub mod hex;
pub mod keys;
pub mod numeric;
pub mod schema;

use serde_json::Value;
use thiserror::Error;

pub use address::{parse_address, require_address, validate_address};
pub use block::validate_block;
pub use hex::{validate_bytecode, validate_hash, validate_hex};
pub use keys::{require_private_key, validate_private_key};
pub use numeric::{parse_uint, validate_gas_limit, validate_gas_price, validate_u64, validate_wei};
pub use schema::{FieldRule, ParamValue, Schema, ValidatedParams};

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type Validated<T> = Result<T, ValidationError>;

/// Short JSON type name used in "must be X, got Y" messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
