//! Integer-like inputs: wei amounts, gas, nonces.
//!
//! Accepts a native JSON integer, a decimal string or a `0x` hex string.
//! Bounds are enforced, never clamped.

use alloy::primitives::U256;
use serde_json::Value;

use crate::validation::{json_type_name, Validated, ValidationError};

pub const MIN_GAS_LIMIT: u64 = 21_000;
pub const MAX_GAS_LIMIT: u64 = 30_000_000;
/// 10,000 gwei.
pub const MAX_GAS_PRICE: u128 = 10_000_000_000_000;

/// Parse an unsigned integer of up to 256 bits. `what` names the value in
/// error messages.
pub fn parse_uint(value: &Value, what: &str) -> Validated<U256> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(U256::from(v));
            }
            if n.as_i64().is_some_and(|v| v < 0) || n.as_f64().is_some_and(|v| v < 0.0) {
                return Err(ValidationError::new(format!("{} must be non-negative", what)));
            }
            // Floats, and integers beyond u64 which serde_json stores as floats.
            Err(ValidationError::new(format!("{} must be an integer", what)))
        }
        Value::String(s) => parse_uint_str(s.trim(), what),
        other => Err(ValidationError::new(format!(
            "{} must be an integer or string, got {}",
            what,
            json_type_name(other)
        ))),
    }
}

fn parse_uint_str(s: &str, what: &str) -> Validated<U256> {
    if s.starts_with('-') {
        return Err(ValidationError::new(format!("{} must be non-negative", what)));
    }

    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| {
            if radix == 16 {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            }
        });
    if !well_formed {
        return Err(ValidationError::new(format!("Invalid {}", what.to_lowercase())));
    }

    // Digits are already known good, so a failure here is overflow.
    U256::from_str_radix(digits, radix).map_err(|_| {
        ValidationError::new(format!("{} exceeds maximum uint256 value", what))
    })
}

/// Amount in wei, up to 2^256 - 1.
pub fn validate_wei(value: &Value) -> Validated<U256> {
    parse_uint(value, "Wei value")
}

pub fn validate_gas_limit(value: &Value) -> Validated<u64> {
    let gas = parse_uint(value, "Gas limit")?;
    if gas < U256::from(MIN_GAS_LIMIT) {
        return Err(ValidationError::new(format!(
            "Gas limit must be at least {}, got {}",
            MIN_GAS_LIMIT, gas
        )));
    }
    if gas > U256::from(MAX_GAS_LIMIT) {
        return Err(ValidationError::new(format!(
            "Gas limit {} exceeds maximum of {}",
            gas, MAX_GAS_LIMIT
        )));
    }
    Ok(gas.to::<u64>())
}

pub fn validate_gas_price(value: &Value) -> Validated<u128> {
    let price = parse_uint(value, "Gas price")?;
    if price > U256::from(MAX_GAS_PRICE) {
        return Err(ValidationError::new(format!(
            "Gas price {} exceeds maximum of {}",
            price, MAX_GAS_PRICE
        )));
    }
    Ok(price.to::<u128>())
}

/// Nonces, block numbers and other 64-bit counters.
pub fn validate_u64(value: &Value, what: &str) -> Validated<u64> {
    let n = parse_uint(value, what)?;
    u64::try_from(n).map_err(|_| {
        ValidationError::new(format!("{} exceeds maximum value {}", what, u64::MAX))
    })
}
