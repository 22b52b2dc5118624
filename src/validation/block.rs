//! Block identifiers: tags or non-negative block numbers.

use serde_json::Value;

use crate::blockchain::types::{BlockSelector, BlockTag};
use crate::validation::{json_type_name, Validated, ValidationError};

pub fn validate_block(value: &Value) -> Validated<BlockSelector> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => Ok(BlockSelector::Number(v)),
            None if n.as_i64().is_some_and(|v| v < 0) => {
                Err(ValidationError::new("Block number must be non-negative"))
            }
            None => Err(ValidationError::new("Invalid block identifier format")),
        },
        Value::String(s) => parse_block(s.trim()),
        other => Err(ValidationError::new(format!(
            "Block identifier must be an integer or string, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_block(s: &str) -> Validated<BlockSelector> {
    if let Some(tag) = BlockTag::parse(&s.to_ascii_lowercase()) {
        return Ok(BlockSelector::Tag(tag));
    }

    if let Some(hex) = s.strip_prefix("0x") {
        // from_str_radix tolerates a leading '+'
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::new("Invalid hexadecimal block number"));
        }
        return u64::from_str_radix(hex, 16)
            .map(BlockSelector::Number)
            .map_err(|_| ValidationError::new("Invalid hexadecimal block number"));
    }

    if s.starts_with('-') {
        return Err(ValidationError::new("Block number must be non-negative"));
    }

    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("Invalid block identifier format"));
    }

    s.parse::<u64>()
        .map(BlockSelector::Number)
        .map_err(|_| ValidationError::new("Invalid block identifier format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags() {
        for tag in ["latest", "pending", "earliest", "safe", "finalized", "LATEST"] {
            assert!(matches!(
                validate_block(&json!(tag)).unwrap(),
                BlockSelector::Tag(_)
            ));
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(validate_block(&json!(42)).unwrap(), BlockSelector::Number(42));
        assert_eq!(validate_block(&json!("42")).unwrap(), BlockSelector::Number(42));
        assert_eq!(validate_block(&json!("0x2a")).unwrap(), BlockSelector::Number(42));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            validate_block(&json!("0xzz")).unwrap_err().message(),
            "Invalid hexadecimal block number"
        );
        assert_eq!(
            validate_block(&json!("-1")).unwrap_err().message(),
            "Block number must be non-negative"
        );
        assert_eq!(
            validate_block(&json!(-1)).unwrap_err().message(),
            "Block number must be non-negative"
        );
        assert_eq!(
            validate_block(&json!("newest")).unwrap_err().message(),
            "Invalid block identifier format"
        );
        assert_eq!(
            validate_block(&json!([1])).unwrap_err().message(),
            "Block identifier must be an integer or string, got array"
        );
    }

    #[test]
    fn test_signed_strings_rejected() {
        assert_eq!(
            validate_block(&json!("+5")).unwrap_err().message(),
            "Invalid block identifier format"
        );
        assert_eq!(
            validate_block(&json!("0x+5")).unwrap_err().message(),
            "Invalid hexadecimal block number"
        );
        assert!(validate_block(&json!("0x")).is_err());
    }
}
