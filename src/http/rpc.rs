//! `POST /rpc`, `POST /rpc/stream` and `GET /health`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::envelope::X_REQUEST_ID;
use crate::errors::api::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// `{id?, method, params}`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// `{method, params, batchSize?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_parameters("body", &rejection.body_text())
}

/// Transport id from the request-id layer. Clients may set it, so it is only
/// logged for correlation and never used as the request context key.
fn transport_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

pub async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RpcRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return state.dispatcher.reject(body_error(rejection)).into_response(),
    };

    let request_id = Uuid::new_v4();
    tracing::debug!(
        request_id = %request_id,
        transport_id = %transport_id(&headers),
        method = %request.method,
        "RPC request"
    );
    state
        .dispatcher
        .invoke_as(request_id, &request.method, request.params)
        .await
        .with_id(request.id)
        .into_response()
}

pub async fn stream(
    State(state): State<AppState>,
    body: Result<Json<StreamRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return state.dispatcher.reject(body_error(rejection)).into_response(),
    };

    let batch_size = request
        .batch_size
        .unwrap_or(state.response.stream_batch_size);
    match state
        .dispatcher
        .open_stream(&request.method, request.params, batch_size)
        .await
    {
        Ok(stream) => stream.into_response(),
        Err(envelope) => envelope.into_response(),
    }
}

/// 200 while the node answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let reachable = state.dispatcher.services().chain.is_healthy().await;
    metrics::record_chain_health(reachable);

    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if reachable { "healthy" } else { "degraded" },
        "chainReachable": reachable,
        "chainId": state.dispatcher.chain_id(),
        "activeWatches": state.monitor.active_count(),
    });
    (status, Json(body)).into_response()
}
