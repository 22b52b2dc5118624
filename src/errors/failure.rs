//! Everything a handler can fail with, before normalization.

use std::any::Any;
use std::backtrace::Backtrace;

use thiserror::Error;

use crate::blockchain::types::ChainError;
use crate::errors::api::ApiError;

/// Raw handler failure.
///
/// The dispatcher funnels every variant through the normalizer exactly once,
/// so nothing outside `errors` ever has to look inside a `Failure`.
#[derive(Debug, Error)]
pub enum Failure {
    /// Already a taxonomy error; passes through untouched.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Categorized upstream chain client failure.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Programming error or caught panic.
    #[error("{type_name}: {message}")]
    Unexpected {
        type_name: String,
        message: String,
        backtrace: String,
    },
}

impl Failure {
    /// Wrap any error value as unexpected, recording its concrete type.
    pub fn unexpected<E>(err: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Unexpected {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    /// Convert the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Unexpected {
            type_name: "panic".to_string(),
            message,
            backtrace: Backtrace::force_capture().to_string(),
        }
    }
}

pub type HandlerResult<T> = Result<T, Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_records_type() {
        let err = "12x".parse::<u32>().unwrap_err();
        match Failure::unexpected(err) {
            Failure::Unexpected { type_name, message, .. } => {
                assert!(type_name.contains("ParseIntError"));
                assert!(message.contains("invalid digit"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_from_panic_string_payloads() {
        let f = Failure::from_panic(Box::new("static boom"));
        assert!(f.to_string().contains("static boom"));

        let f = Failure::from_panic(Box::new(String::from("owned boom")));
        assert!(f.to_string().contains("owned boom"));

        let f = Failure::from_panic(Box::new(42u8));
        assert!(f.to_string().contains("non-string"));
    }
}
