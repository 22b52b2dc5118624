//! Transaction subscriptions over WebSocket.
//!
//! # Data Flow
//! ```text
//! GET /ws/transactions/{address} → upgrade
//!     → address validation (failure: one INVALID_PARAMETERS frame, then close)
//!     → TransactionMonitor::subscribe
//!     → one text frame per matching transaction
//!     → client "stop" / close / shutdown ends the watch
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};

use crate::blockchain::format::checksum;
use crate::errors::api::ApiError;
use crate::errors::failure::Failure;
use crate::http::server::AppState;
use crate::validation::address::require_address;

pub async fn subscribe(
    State(state): State<AppState>,
    Path(address): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, state, address))
}

async fn reject(mut socket: WebSocket, state: &AppState, failure: Failure) {
    let envelope = state.dispatcher.reject(failure);
    let _ = socket
        .send(Message::Text(envelope.to_json().to_string().into()))
        .await;
    let _ = socket.send(Message::Close(None)).await;
}

async fn serve(mut socket: WebSocket, state: AppState, raw: String) {
    let address = match require_address("address", &raw) {
        Ok(address) => address,
        Err(e) => return reject(socket, &state, e.into()).await,
    };

    let mut subscription = match state.monitor.subscribe(address).await {
        Ok(Some(subscription)) => subscription,
        Ok(None) => {
            let err = ApiError::invalid_parameters("address", "Address is already being monitored");
            return reject(socket, &state, err.into()).await;
        }
        Err(failure) => return reject(socket, &state, failure).await,
    };
    tracing::info!(address = %checksum(address), "Subscription opened");

    loop {
        tokio::select! {
            delivered = subscription.recv() => {
                let Some(transaction) = delivered else { break };
                let frame = match serde_json::to_string(&transaction) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize transaction");
                        continue;
                    }
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) if text.as_str().trim().eq_ignore_ascii_case("stop") => break,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(subscription);
    let _ = socket.send(Message::Close(None)).await;
    tracing::info!(address = %checksum(address), "Subscription closed");
}
