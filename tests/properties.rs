//! Property tests for input normalization.

use alloy::primitives::{Address, U256};
use eth_rpc_gateway::blockchain::format::checksum;
use eth_rpc_gateway::validation::{validate_address, validate_wei};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn address_case_forms_agree(bytes in prop::array::uniform20(any::<u8>())) {
        let address = Address::from(bytes);
        let lower = format!("{:#x}", address);
        let checksummed = checksum(address);

        prop_assert_eq!(validate_address(&json!(lower)).unwrap(), address);
        prop_assert_eq!(validate_address(&json!(checksummed)).unwrap(), address);
        prop_assert_eq!(checksum(validate_address(&json!(checksummed)).unwrap()), checksummed);
    }

    #[test]
    fn wei_decimal_and_hex_agree(value in any::<u64>()) {
        let decimal = validate_wei(&json!(value.to_string())).unwrap();
        let hex = validate_wei(&json!(format!("{:#x}", value))).unwrap();
        let number = validate_wei(&json!(value)).unwrap();

        prop_assert_eq!(decimal, U256::from(value));
        prop_assert_eq!(hex, decimal);
        prop_assert_eq!(number, decimal);
    }

    #[test]
    fn short_addresses_are_rejected(len in 0usize..40) {
        let raw = format!("0x{}", "a".repeat(len));
        prop_assert!(validate_address(&json!(raw)).is_err());
    }
}
