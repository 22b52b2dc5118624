//! Error taxonomy and normalization.
//!
//! # Data Flow
//! ```text
//! handler → Failure (ApiError | ChainError | unexpected/panic)
//!     → normalizer.rs (context lookup, message scan, debug enrichment)
//!     → ApiError (stable code + details)
//!     → envelope (error response)
//! ```

pub mod api;
pub mod failure;
pub mod kind;
pub mod normalizer;

pub use api::{ApiError, ApiResult, FieldError};
pub use failure::{Failure, HandlerResult};
pub use kind::ErrorKind;
pub use normalizer::ErrorNormalizer;
