//! Composed per-operation parameter schemas.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::{Map, Value};

use crate::blockchain::types::BlockSelector;
use crate::errors::api::{ApiError, ApiResult, FieldError};
use crate::validation::abi::{validate_abi, ParsedAbi};
use crate::validation::{
    json_type_name, validate_address, validate_block, validate_bytecode, validate_gas_limit,
    validate_gas_price, validate_hash, validate_hex, validate_private_key, validate_u64,
    validate_wei, Validated, ValidationError,
};

/// How a single field is checked and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Address,
    PrivateKey,
    Hex,
    Bytecode,
    Hash,
    Wei,
    GasLimit,
    GasPrice,
    Nonce,
    /// Any 64-bit counter (timeouts, batch sizes).
    U64,
    Block,
    Bool,
    Text,
    Abi,
    Array,
    Object,
}

/// A validated secret key. `Debug` never prints it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(pub B256);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// A normalized field value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Address(Address),
    Secret(SecretKey),
    Bytes(Bytes),
    Hash(B256),
    Uint(U256),
    U64(u64),
    U128(u128),
    Block(BlockSelector),
    Bool(bool),
    Text(String),
    Abi(Box<ParsedAbi>),
    Json(Value),
}

impl FieldRule {
    fn apply(self, field: &str, value: &Value) -> Validated<ParamValue> {
        Ok(match self {
            Self::Address => ParamValue::Address(validate_address(value)?),
            Self::PrivateKey => ParamValue::Secret(SecretKey(validate_private_key(value)?)),
            Self::Hex => ParamValue::Bytes(validate_hex(value, None)?),
            Self::Bytecode => ParamValue::Bytes(validate_bytecode(value)?),
            Self::Hash => ParamValue::Hash(validate_hash(value)?),
            Self::Wei => ParamValue::Uint(validate_wei(value)?),
            Self::GasLimit => ParamValue::U64(validate_gas_limit(value)?),
            Self::GasPrice => ParamValue::U128(validate_gas_price(value)?),
            Self::Nonce => ParamValue::U64(validate_u64(value, "Nonce")?),
            Self::U64 => ParamValue::U64(validate_u64(value, field)?),
            Self::Block => ParamValue::Block(validate_block(value)?),
            Self::Bool => match value {
                Value::Bool(b) => ParamValue::Bool(*b),
                other => return Err(type_error("a boolean", other)),
            },
            Self::Text => match value {
                Value::String(s) => ParamValue::Text(s.clone()),
                other => return Err(type_error("a string", other)),
            },
            Self::Abi => ParamValue::Abi(Box::new(validate_abi(value)?)),
            Self::Array => match value {
                Value::Array(_) => ParamValue::Json(value.clone()),
                other => return Err(type_error("a list", other)),
            },
            Self::Object => match value {
                Value::Object(_) => ParamValue::Json(value.clone()),
                other => return Err(type_error("an object", other)),
            },
        })
    }
}

fn type_error(expected: &str, got: &Value) -> ValidationError {
    ValidationError::new(format!("Must be {}, got {}", expected, json_type_name(got)))
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    rule: FieldRule,
    required: bool,
}

/// Ordered field rules for one operation.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name,
            rule,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name,
            rule,
            required: false,
        });
        self
    }

    /// Run every rule and report all failures at once. Unknown fields are
    /// ignored; `null` counts as absent.
    pub fn validate(&self, params: &Value) -> ApiResult<ValidatedParams> {
        let empty = Map::new();
        let object = match params {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ApiError::invalid_parameters(
                    "params",
                    "Parameters must be an object",
                ))
            }
        };

        let mut values = HashMap::with_capacity(self.fields.len());
        let mut errors = Vec::new();

        for spec in &self.fields {
            match object.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        errors.push(FieldError::new(spec.name, "Field is required"));
                    }
                }
                Some(value) => match spec.rule.apply(spec.name, value) {
                    Ok(v) => {
                        values.insert(spec.name, v);
                    }
                    Err(e) => errors.push(FieldError::new(spec.name, e.message())),
                },
            }
        }

        if errors.is_empty() {
            Ok(ValidatedParams { values })
        } else {
            Err(ApiError::invalid_parameter_set(&errors))
        }
    }
}

/// Error for a field a handler needs but the schema did not produce.
pub fn missing(field: &str) -> ApiError {
    ApiError::invalid_parameters(field, "Field is required")
}

/// Normalized parameters keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct ValidatedParams {
    values: HashMap<&'static str, ParamValue>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        match self.get(name)? {
            ParamValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn secret(&self, name: &str) -> Option<B256> {
        match self.get(name)? {
            ParamValue::Secret(k) => Some(k.0),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<Bytes> {
        match self.get(name)? {
            ParamValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }

    pub fn hash(&self, name: &str) -> Option<B256> {
        match self.get(name)? {
            ParamValue::Hash(h) => Some(*h),
            _ => None,
        }
    }

    pub fn uint(&self, name: &str) -> Option<U256> {
        match self.get(name)? {
            ParamValue::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            ParamValue::U64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn u128(&self, name: &str) -> Option<u128> {
        match self.get(name)? {
            ParamValue::U128(n) => Some(*n),
            _ => None,
        }
    }

    pub fn block(&self, name: &str) -> Option<BlockSelector> {
        match self.get(name)? {
            ParamValue::Block(b) => Some(*b),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn abi(&self, name: &str) -> Option<&ParsedAbi> {
        match self.get(name)? {
            ParamValue::Abi(abi) => Some(abi.as_ref()),
            _ => None,
        }
    }

    pub fn json(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            ParamValue::Json(v) => Some(v),
            _ => None,
        }
    }
}
