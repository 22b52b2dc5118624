//! Uniform response envelopes.
//!
//! # Data Flow
//! ```text
//! handler result / normalized ApiError
//!     → ResponseEnvelope (result or error + metadata)
//!     → IntoResponse (status, x-request-id / x-chain-id / x-processing-time)
//!     → CompressionLayer (gzip above the configured size)
//!
//! history producer
//!     → StreamFormatter (start frame, batched data frames, end frame)
//!     → application/x-ndjson body
//! ```

pub mod stream;

use std::time::{Duration, Instant};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::api::ApiError;
use crate::errors::kind::ErrorKind;

pub use stream::StreamFormatter;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_CHAIN_ID: &str = "x-chain-id";
pub const X_PROCESSING_TIME: &str = "x-processing-time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: String,
    pub request_id: Uuid,
    pub chain_id: u64,
    pub processing_time: String,
    pub status: Status,
    /// Caller-supplied request id, echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// `"0.012s"`.
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

#[derive(Debug, Clone)]
enum Body {
    Result(Value),
    Error { kind: ErrorKind, body: Value },
}

/// One complete response. Built in a single step, never partially filled.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    body: Body,
    metadata: Metadata,
    pretty: bool,
}

impl ResponseEnvelope {
    /// Wrap a handler result. Objects lacking both `chain_id` and `chainId`
    /// gain `chainId`; existing values are left alone.
    pub fn success(mut result: Value, request_id: Uuid, chain_id: u64, started: Instant) -> Self {
        if let Value::Object(map) = &mut result {
            if !map.contains_key("chain_id") && !map.contains_key("chainId") {
                map.insert("chainId".to_string(), json!(chain_id));
            }
        }
        Self {
            body: Body::Result(result),
            metadata: Self::build_metadata(request_id, chain_id, started, Status::Success),
            pretty: false,
        }
    }

    pub fn error(err: &ApiError, request_id: Uuid, chain_id: u64, started: Instant) -> Self {
        Self {
            body: Body::Error {
                kind: err.kind(),
                body: err.to_body(),
            },
            metadata: Self::build_metadata(request_id, chain_id, started, Status::Error),
            pretty: false,
        }
    }

    fn build_metadata(request_id: Uuid, chain_id: u64, started: Instant, status: Status) -> Metadata {
        Metadata {
            timestamp: Utc::now().to_rfc3339(),
            request_id,
            chain_id,
            processing_time: format_processing_time(started.elapsed()),
            status,
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.metadata.id = id;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn status(&self) -> Status {
        self.metadata.status
    }

    pub fn is_success(&self) -> bool {
        self.metadata.status == Status::Success
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            Body::Result(v) => Some(v),
            Body::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.body {
            Body::Error { kind, .. } => Some(*kind),
            Body::Result(_) => None,
        }
    }

    /// The `{code, message, details}` object of an error envelope.
    pub fn error_body(&self) -> Option<&Value> {
        match &self.body {
            Body::Error { body, .. } => Some(body),
            Body::Result(_) => None,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match &self.body {
            Body::Result(_) => StatusCode::OK,
            Body::Error { kind, .. } => kind.status_code(),
        }
    }

    pub fn to_json(&self) -> Value {
        let metadata = serde_json::to_value(&self.metadata).unwrap_or(Value::Null);
        match &self.body {
            Body::Result(result) => json!({ "result": result, "metadata": metadata }),
            Body::Error { body, .. } => json!({ "error": body, "metadata": metadata }),
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let value = self.to_json();
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        };
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response envelope");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let mut response = (self.http_status(), bytes).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let pairs = [
            (X_REQUEST_ID, self.metadata.request_id.to_string()),
            (X_CHAIN_ID, self.metadata.chain_id.to_string()),
            (X_PROCESSING_TIME, self.metadata.processing_time.clone()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        response
    }
}
