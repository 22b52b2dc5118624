//! Closed set of failure kinds with stable wire codes.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry per taxonomy leaf.
///
/// The serialized form is the stable string code (`"WALLET_NOT_FOUND"`, ...)
/// that clients match on. Codes never change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    WalletNotFound,
    WalletAlreadyExists,
    InvalidAddress,
    InvalidPrivateKey,
    InsufficientFunds,
    NonceTooLow,
    GasTooLow,
    TransactionFailed,
    TransactionNotFound,
    ContractNotFound,
    MethodNotFound,
    InvalidAbi,
    InvalidParameters,
    InternalError,
    RateLimited,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 15] = [
        ErrorKind::WalletNotFound,
        ErrorKind::WalletAlreadyExists,
        ErrorKind::InvalidAddress,
        ErrorKind::InvalidPrivateKey,
        ErrorKind::InsufficientFunds,
        ErrorKind::NonceTooLow,
        ErrorKind::GasTooLow,
        ErrorKind::TransactionFailed,
        ErrorKind::TransactionNotFound,
        ErrorKind::ContractNotFound,
        ErrorKind::MethodNotFound,
        ErrorKind::InvalidAbi,
        ErrorKind::InvalidParameters,
        ErrorKind::InternalError,
        ErrorKind::RateLimited,
    ];

    /// Stable string code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::WalletNotFound => "WALLET_NOT_FOUND",
            ErrorKind::WalletAlreadyExists => "WALLET_ALREADY_EXISTS",
            ErrorKind::InvalidAddress => "INVALID_ADDRESS",
            ErrorKind::InvalidPrivateKey => "INVALID_PRIVATE_KEY",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::NonceTooLow => "NONCE_TOO_LOW",
            ErrorKind::GasTooLow => "GAS_TOO_LOW",
            ErrorKind::TransactionFailed => "TRANSACTION_FAILED",
            ErrorKind::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorKind::ContractNotFound => "CONTRACT_NOT_FOUND",
            ErrorKind::MethodNotFound => "METHOD_NOT_FOUND",
            ErrorKind::InvalidAbi => "INVALID_ABI",
            ErrorKind::InvalidParameters => "INVALID_PARAMETERS",
            ErrorKind::InternalError => "INTERNAL_ERROR",
            ErrorKind::RateLimited => "RATE_LIMITED",
        }
    }

    /// Default transport status. Only consulted at the HTTP boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::WalletNotFound
            | ErrorKind::TransactionNotFound
            | ErrorKind::ContractNotFound
            | ErrorKind::MethodNotFound => StatusCode::NOT_FOUND,
            ErrorKind::WalletAlreadyExists => StatusCode::CONFLICT,
            ErrorKind::InvalidAddress
            | ErrorKind::InvalidPrivateKey
            | ErrorKind::InsufficientFunds
            | ErrorKind::NonceTooLow
            | ErrorKind::GasTooLow
            | ErrorKind::InvalidAbi
            | ErrorKind::InvalidParameters => StatusCode::BAD_REQUEST,
            ErrorKind::TransactionFailed | ErrorKind::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_serde_matches_code() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.code().to_string()));
        }
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(ErrorKind::WalletAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::InvalidParameters.status_code(), StatusCode::BAD_REQUEST);
        assert!(ErrorKind::InternalError.status_code().is_server_error());
    }
}
