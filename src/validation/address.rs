//! Ethereum address validation with EIP-55 checksum enforcement.

use std::str::FromStr;

use alloy::primitives::Address;
use serde_json::Value;

use crate::errors::api::{ApiError, ApiResult, FieldError};
use crate::validation::{json_type_name, Validated, ValidationError};

/// Validate a JSON value as an address and return it checksum-normalized.
pub fn validate_address(value: &Value) -> Validated<Address> {
    match value {
        Value::String(s) => parse_address(s),
        other => Err(ValidationError::new(format!(
            "Address must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

/// Prefix is checked before length, length before hex, hex before checksum.
/// All-lowercase and all-uppercase payloads skip the checksum test.
pub fn parse_address(raw: &str) -> Validated<Address> {
    let s = raw.trim();
    let Some(payload) = s.strip_prefix("0x") else {
        return Err(ValidationError::new("Address must start with '0x'"));
    };

    let len = s.chars().count();
    if len != 42 {
        return Err(ValidationError::new(format!(
            "Address must be 42 characters long (0x + 40 hex), got {}",
            len
        )));
    }

    if !payload.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            "Address contains invalid hexadecimal characters",
        ));
    }

    let address = Address::from_str(payload)
        .map_err(|_| ValidationError::new("Address contains invalid hexadecimal characters"))?;

    let has_lower = payload.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = payload.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None)[2..] != *payload {
        return Err(ValidationError::new("Address has invalid EIP-55 checksum"));
    }

    Ok(address)
}

/// Standalone form for an address outside a parameter object, such as a
/// path segment. Failures are reported exactly like a bad `field` in a
/// composed schema.
pub fn require_address(field: &str, raw: &str) -> ApiResult<Address> {
    parse_address(raw)
        .map_err(|e| ApiError::invalid_parameter_set(&[FieldError::new(field, e.message())]))
}
