//! Hex blob validation.

use alloy::primitives::{Bytes, B256};
use serde_json::Value;

use crate::validation::{json_type_name, Validated, ValidationError};

/// `0x` prefix, even length, hex digits. `0x` alone is the empty blob and
/// only fails when a non-zero `expected_len` is given.
pub fn validate_hex(value: &Value, expected_len: Option<usize>) -> Validated<Bytes> {
    let s = match value {
        Value::String(s) => s.trim(),
        other => {
            return Err(ValidationError::new(format!(
                "Hex string must be a string, got {}",
                json_type_name(other)
            )))
        }
    };
    let Some(payload) = s.strip_prefix("0x") else {
        return Err(ValidationError::new("Hex string must start with '0x'"));
    };

    if payload.is_empty() {
        return match expected_len {
            Some(n) if n > 0 => Err(ValidationError::new(format!(
                "Expected {} bytes, got 0",
                n
            ))),
            _ => Ok(Bytes::new()),
        };
    }

    if payload.len() % 2 != 0 {
        return Err(ValidationError::new(
            "Hex string must have even length (each byte is 2 hex characters)",
        ));
    }

    let bytes = alloy::hex::decode(payload)
        .map_err(|_| ValidationError::new("Hex string contains invalid hexadecimal characters"))?;

    if let Some(n) = expected_len {
        if bytes.len() != n {
            return Err(ValidationError::new(format!(
                "Expected {} bytes, got {}",
                n,
                bytes.len()
            )));
        }
    }

    Ok(Bytes::from(bytes))
}

/// 32-byte transaction or block hash.
pub fn validate_hash(value: &Value) -> Validated<B256> {
    let bytes = validate_hex(value, Some(32))?;
    Ok(B256::from_slice(&bytes))
}

/// Deployable code: a non-empty hex blob.
pub fn validate_bytecode(value: &Value) -> Validated<Bytes> {
    let bytes = validate_hex(value, None)?;
    if bytes.is_empty() {
        return Err(ValidationError::new("Bytecode cannot be empty"));
    }
    Ok(bytes)
}
