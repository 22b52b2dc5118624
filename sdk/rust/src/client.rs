use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::types::{Envelope, Health, SdkError};

/// HTTP client for one gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `method` and return the envelope, whatever its status.
    pub async fn invoke(&self, method: &str, params: Value) -> Result<Envelope, SdkError> {
        self.post_rpc(json!({ "method": method, "params": params })).await
    }

    /// As [`GatewayClient::invoke`], with an id echoed in the metadata.
    pub async fn invoke_with_id(&self, id: Value, method: &str, params: Value) -> Result<Envelope, SdkError> {
        self.post_rpc(json!({ "id": id, "method": method, "params": params })).await
    }

    /// Run `method` and deserialize its result. Gateway errors become
    /// [`SdkError::Api`].
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SdkError> {
        let result = self.invoke(method, params).await?.into_result()?;
        Ok(serde_json::from_value(result)?)
    }

    async fn post_rpc(&self, body: Value) -> Result<Envelope, SdkError> {
        let text = self
            .client
            .post(format!("{}/rpc", self.base_url))
            .json(&body)
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every NDJSON frame of a streamed history query, in order.
    pub async fn stream_history(&self, params: Value, batch_size: Option<usize>) -> Result<Vec<Value>, SdkError> {
        let mut body = json!({ "method": "eth_getTransactionHistory", "params": params });
        if let Some(size) = batch_size {
            body["batchSize"] = json!(size);
        }
        let text = self
            .client
            .post(format!("{}/rpc/stream", self.base_url))
            .json(&body)
            .send()
            .await?
            .text()
            .await?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(SdkError::from))
            .collect()
    }

    pub async fn health(&self) -> Result<Health, SdkError> {
        let text = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&text)?)
    }
}
