//! Maps any [`Failure`] to exactly one [`ApiError`].

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::blockchain::types::ChainError;
use crate::context::RequestContext;
use crate::errors::api::ApiError;
use crate::errors::failure::Failure;
use crate::observability::metrics;

const UNKNOWN: &str = "unknown";

/// Single normalization point for the dispatch boundary.
#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    debug: bool,
    context: RequestContext,
}

impl ErrorNormalizer {
    pub fn new(debug: bool, context: RequestContext) -> Self {
        Self { debug, context }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Normalize `failure`. Never fails; missing context just means
    /// `"unknown"` in the details.
    pub fn normalize(&self, failure: Failure, request_id: Option<Uuid>) -> ApiError {
        let request_id = request_id.unwrap_or_else(Uuid::new_v4);
        let ctx = self.context.get(request_id);

        let error = match failure {
            Failure::Api(e) => e,
            Failure::Chain(e) => map_chain_error(e, &ctx),
            Failure::Unexpected {
                type_name,
                message,
                backtrace,
            } => {
                let err = ApiError::internal("Internal server error");
                if self.debug {
                    err.with_detail("exception_type", json!(type_name))
                        .with_detail("exception_message", json!(message))
                        .with_detail("traceback", json!(backtrace))
                } else {
                    err
                }
            }
        };

        let context = Value::Object(ctx);
        tracing::error!(
            request_id = %request_id,
            code = %error.kind(),
            message = %error.message(),
            context = %context,
            "Request failed"
        );
        metrics::record_error(error.kind().code());

        error
    }
}

fn ctx_str(ctx: &Map<String, Value>, key: &str) -> String {
    match ctx.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN.to_string(),
        Some(other) => other.to_string(),
    }
}

fn ctx_u64(ctx: &Map<String, Value>, key: &str) -> u64 {
    ctx.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn map_chain_error(err: ChainError, ctx: &Map<String, Value>) -> ApiError {
    match err {
        ChainError::InvalidAddress(address) => {
            ApiError::invalid_address(&address, Some("Invalid checksum or format"))
        }
        ChainError::TransactionNotFound(hash) => {
            let hash = hash.unwrap_or_else(|| ctx_str(ctx, "tx_hash"));
            ApiError::transaction_not_found(&hash)
        }
        ChainError::Reverted(msg) => scan_message(&msg, ctx)
            .unwrap_or_else(|| ApiError::transaction_failed(&ctx_str(ctx, "tx_hash"), &msg)),
        ChainError::Validation(msg) => {
            ApiError::invalid_parameters(&ctx_str(ctx, "parameter"), &msg)
        }
        ChainError::Timeout(_) => {
            ApiError::transaction_failed(&ctx_str(ctx, "tx_hash"), "Transaction timeout")
        }
        ChainError::Signing(msg) => ApiError::transaction_failed(&ctx_str(ctx, "tx_hash"), &msg),
        ChainError::Rpc(msg) => scan_message(&msg, ctx)
            .unwrap_or_else(|| ApiError::internal(format!("Upstream error: {}", msg))),
        e @ (ChainError::NotAvailable(_)
        | ChainError::BlockUnavailable(_)
        | ChainError::ChainMismatch { .. }) => {
            ApiError::internal(e.to_string())
        }
    }
}

/// Best-effort classification of upstream message text. Order matters: the
/// first pattern found wins.
pub fn scan_message(msg: &str, ctx: &Map<String, Value>) -> Option<ApiError> {
    let lower = msg.to_lowercase();

    if lower.contains("insufficient funds") {
        return Some(ApiError::insufficient_funds(
            UNKNOWN,
            UNKNOWN,
            &ctx_str(ctx, "address"),
        ));
    }
    if lower.contains("nonce too low") {
        return Some(ApiError::nonce_too_low(ctx_u64(ctx, "nonce"), 0));
    }
    if lower.contains("gas too low") || lower.contains("out of gas") {
        return Some(ApiError::gas_too_low(ctx_u64(ctx, "gas"), 0));
    }
    if lower.contains("invalid address") {
        return Some(ApiError::invalid_address(&ctx_str(ctx, "address"), None));
    }
    if lower.contains("execution reverted") {
        return Some(ApiError::transaction_failed(
            &ctx_str(ctx, "tx_hash"),
            "Contract execution reverted",
        ));
    }
    None
}
