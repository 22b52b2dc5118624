//! HTTP, streaming, WebSocket and SDK round trips through the real router.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::{transfer, MockChain, CHAIN_ID};
use eth_rpc_gateway::lifecycle::startup::{assemble, Gateway};
use eth_rpc_gateway::{GatewayConfig, Shutdown, TransactionMonitor};
use futures_util::{SinkExt, StreamExt};
use sdk_rust::{GatewayClient, SdkError};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

const ALICE: &str = "0x1111111111111111111111111111111111111111";

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.monitor.poll_interval_ms = 10;
    config.monitor.error_backoff_ms = 20;
    config
}

fn gateway(chain: Arc<MockChain>) -> Gateway {
    assemble(&config(), chain)
}

fn rpc(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/rpc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve on an ephemeral port until the returned handle is triggered.
async fn serve(gateway: Gateway) -> (SocketAddr, TransactionMonitor, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let rx = shutdown.subscribe();
    let monitor = gateway.monitor.clone();
    tokio::spawn(gateway.server.run(listener, rx));
    (addr, monitor, shutdown)
}

#[tokio::test]
async fn test_rpc_success_envelope() {
    let app = gateway(MockChain::new()).server.router();

    let response = app
        .oneshot(rpc(json!({ "id": 7, "method": "eth_getBlockNumber", "params": {} })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(response.headers()["x-chain-id"], CHAIN_ID.to_string().as_str());

    let body = body_json(response).await;
    assert_eq!(body["result"]["blockNumber"], 100);
    assert_eq!(body["metadata"]["status"], "success");
    assert_eq!(body["metadata"]["id"], 7);
    assert_eq!(body["metadata"]["request_id"], header_id.as_str());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_client_request_id_not_reused() {
    let app = gateway(MockChain::new()).server.router();
    let client_id = "00000000-0000-4000-8000-000000000001";

    let mut seen = Vec::new();
    for _ in 0..2 {
        let mut request = rpc(json!({ "method": "eth_getBlockNumber", "params": {} }));
        request
            .headers_mut()
            .insert("x-request-id", client_id.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let body = body_json(response).await;
        let request_id = body["metadata"]["request_id"].as_str().unwrap().to_string();
        assert_eq!(header_id, request_id);
        assert_ne!(request_id, client_id);
        seen.push(request_id);
    }
    assert_ne!(seen[0], seen[1]);
}

#[tokio::test]
async fn test_rpc_error_status() {
    let app = gateway(MockChain::new()).server.router();

    let response = app
        .oneshot(rpc(json!({
            "method": "eth_sendTransaction",
            "params": { "from": ALICE, "to": ALICE }
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "WALLET_NOT_FOUND");
    assert_eq!(body["metadata"]["status"], "error");
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_malformed_body() {
    let app = gateway(MockChain::new()).server.router();

    let request = Request::builder()
        .method("POST")
        .uri("/rpc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_PARAMETERS");
    assert_eq!(body["error"]["details"]["parameter_name"], "body");
}

#[tokio::test]
async fn test_health() {
    let chain = MockChain::new();
    let app = gateway(chain.clone()).server.router();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["chainId"], CHAIN_ID);

    chain.set_unreachable(true);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["chainReachable"], false);
}

#[tokio::test]
async fn test_stream_is_ndjson() {
    let chain = MockChain::new();
    let alice = Address::repeat_byte(0x11);
    for n in 0..3u64 {
        chain.mine(96 + n, vec![transfer(n, alice, Address::repeat_byte(0x22), 1)]);
    }
    let app = gateway(chain).server.router();

    let request = Request::builder()
        .method("POST")
        .uri("/rpc/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "method": "eth_getTransactionHistory",
                "params": { "address": ALICE, "startBlock": 90 },
                "batchSize": 2
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");
    assert_eq!(response.headers()["x-stream-format"], "jsonlines");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let frames: Vec<Value> = std::str::from_utf8(&bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[3]["metadata"]["total_items"], 3);
}

#[tokio::test]
async fn test_stream_rejects_bad_params() {
    let app = gateway(MockChain::new()).server.router();

    let request = Request::builder()
        .method("POST")
        .uri("/rpc/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "method": "eth_getTransactionHistory", "params": { "address": "0x1" } })
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn test_websocket_delivers_and_stops() {
    let chain = MockChain::new();
    let (addr, monitor, shutdown) = serve(gateway(chain.clone())).await;
    let alice = Address::repeat_byte(0x11);

    let url = format!("ws://{}/ws/transactions/{}", addr, ALICE);
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    while !monitor.is_active(alice) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let tx = transfer(1, Address::repeat_byte(0x22), alice, 5);
    chain.mine(101, vec![tx.clone()]);

    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let delivered: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(delivered["hash"], tx.hash.to_string());
    assert_eq!(delivered["value"], "5");

    ws.send(Message::text("stop")).await.unwrap();
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_close() {
            break;
        }
    }
    for _ in 0..100 {
        if !monitor.is_active(alice) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!monitor.is_active(alice));
    shutdown.trigger();
}

#[tokio::test]
async fn test_websocket_bad_address() {
    let (addr, monitor, shutdown) = serve(gateway(MockChain::new())).await;

    let url = format!("ws://{}/ws/transactions/0xnope", addr);
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let envelope: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(envelope["error"]["code"], "INVALID_PARAMETERS");
    assert_eq!(envelope["error"]["details"]["errors"][0]["field"], "address");
    assert_eq!(monitor.active_count(), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_sdk_round_trip() {
    let chain = MockChain::new();
    chain.set_balance(Address::repeat_byte(0x11), U256::from(42u64));
    let (addr, _, shutdown) = serve(gateway(chain)).await;
    let client = GatewayClient::new(&format!("http://{}/", addr));

    let envelope = client
        .invoke_with_id(json!("abc"), "eth_getBlockNumber", json!({}))
        .await
        .unwrap();
    assert!(envelope.is_success());
    assert_eq!(envelope.metadata.chain_id, CHAIN_ID);
    assert_eq!(envelope.metadata.id, Some(json!("abc")));

    let balance: Value = client
        .call("eth_getBalance", json!({ "address": ALICE }))
        .await
        .unwrap();
    assert_eq!(balance["balance"], "42");

    match client.call::<Value>("eth_importWallet", json!({})).await {
        Err(SdkError::Api(body)) => assert_eq!(body.code, "INVALID_PARAMETERS"),
        other => panic!("unexpected: {:?}", other),
    }

    let health = client.health().await.unwrap();
    assert!(health.chain_reachable);
    assert_eq!(health.active_watches, 0);

    let frames = client
        .stream_history(json!({ "address": ALICE, "startBlock": 95 }), Some(10))
        .await
        .unwrap();
    assert_eq!(frames.len(), 2);
    shutdown.trigger();
}
