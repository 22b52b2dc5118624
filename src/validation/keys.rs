//! Private key validation.

use alloy::primitives::{uint, B256, U256};
use serde_json::Value;

use crate::errors::api::{ApiError, ApiResult};
use crate::validation::{json_type_name, Validated, ValidationError};

/// Order of the secp256k1 group; valid keys are in `[1, n)`.
pub const SECP256K1_ORDER: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

pub fn validate_private_key(value: &Value) -> Validated<B256> {
    match value {
        Value::String(s) => parse_private_key(s),
        other => Err(ValidationError::new(format!(
            "Private key must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

pub fn parse_private_key(raw: &str) -> Validated<B256> {
    let trimmed = raw.trim();
    let key = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let len = key.chars().count();
    if len != 64 {
        return Err(ValidationError::new(format!(
            "Private key must be 64 hex characters (32 bytes), got {}",
            len
        )));
    }
    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            "Private key contains invalid hexadecimal characters",
        ));
    }

    let scalar = U256::from_str_radix(key, 16)
        .map_err(|_| ValidationError::new("Private key contains invalid hexadecimal characters"))?;
    if scalar.is_zero() {
        return Err(ValidationError::new("Private key cannot be zero"));
    }
    if scalar >= SECP256K1_ORDER {
        return Err(ValidationError::new(
            "Private key is outside the valid range for secp256k1",
        ));
    }

    Ok(B256::from(scalar.to_be_bytes::<32>()))
}

/// Standalone form: failures become `INVALID_PRIVATE_KEY`. The key itself
/// never appears in the error.
pub fn require_private_key(raw: &str) -> ApiResult<B256> {
    parse_private_key(raw).map_err(|e| ApiError::invalid_private_key(Some(e.message())))
}
