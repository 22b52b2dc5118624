use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// `metadata` block of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: String,
    pub request_id: String,
    pub chain_id: u64,
    pub processing_time: String,
    /// `"success"` or `"error"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// `error` block of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// A parsed response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub metadata: Metadata,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.metadata.status == "success"
    }

    /// The result, or the gateway's error as [`SdkError::Api`].
    pub fn into_result(self) -> Result<Value, SdkError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(SdkError::Api(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: String,
    pub chain_reachable: bool,
    pub chain_id: u64,
    pub active_watches: usize,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Gateway error {0}")]
    Api(ErrorBody),
}
