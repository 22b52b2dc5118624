//! End-to-end dispatch against an in-memory chain.

mod common;

use alloy::primitives::{Address, U256};
use common::{dispatcher, receipt, transfer, MockChain, CHAIN_ID, DEV_KEY};
use eth_rpc_gateway::ErrorKind;
use futures_util::StreamExt;
use serde_json::{json, Value};

const ALICE: &str = "0x1111111111111111111111111111111111111111";
const BOB: &str = "0x2222222222222222222222222222222222222222";

async fn managed_wallet(d: &eth_rpc_gateway::Dispatcher) -> String {
    let created = d.invoke("eth_createWallet", json!({ "name": "ops" })).await;
    assert!(created.is_success());
    created.result().unwrap()["address"].as_str().unwrap().to_string()
}

fn details(envelope: &eth_rpc_gateway::ResponseEnvelope) -> Value {
    envelope.error_body().unwrap()["details"].clone()
}

#[tokio::test]
async fn test_balance_adds_chain_id() {
    let chain = MockChain::new();
    chain.set_balance(Address::repeat_byte(0x11), U256::from(1_500u64));
    let d = dispatcher(chain, false);

    let envelope = d.invoke("eth_getBalance", json!({ "address": ALICE })).await;
    assert!(envelope.is_success());
    let result = envelope.result().unwrap();
    assert_eq!(result["balance"], "1500");
    assert_eq!(result["block"], "latest");
    assert_eq!(result["chainId"], CHAIN_ID);
    assert_eq!(envelope.metadata().chain_id, CHAIN_ID);
}

#[tokio::test]
async fn test_bad_address_is_invalid_parameters() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d.invoke("eth_getBalance", json!({ "address": "0x123" })).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    let errors = details(&envelope)["errors"].as_array().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "address");
}

#[tokio::test]
async fn test_every_bad_field_is_reported() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke("eth_sendTransaction", json!({ "to": "0x12", "gas": 5 }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    let fields: Vec<String> = details(&envelope)["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["from", "to", "gas"]);
}

#[tokio::test]
async fn test_unknown_method() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d.invoke("eth_bogus", json!({})).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert_eq!(details(&envelope)["method"], "eth_bogus");
    assert_eq!(envelope.http_status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wallet_lifecycle() {
    let d = dispatcher(MockChain::new(), false);

    let created = d.invoke("eth_createWallet", json!({})).await;
    let created = created.result().unwrap();
    assert_eq!(created["name"], created["address"]);
    assert_eq!(created["privateKey"].as_str().unwrap().len(), 66);

    let imported = d
        .invoke("eth_importWallet", json!({ "privateKey": DEV_KEY, "name": "dev" }))
        .await;
    assert!(imported.is_success());
    assert!(imported.result().unwrap().get("privateKey").is_none());

    let again = d
        .invoke("eth_importWallet", json!({ "privateKey": DEV_KEY, "name": "other" }))
        .await;
    assert_eq!(again.error_kind(), Some(ErrorKind::WalletAlreadyExists));

    let listed = d.invoke("eth_listWallets", Value::Null).await;
    let wallets = listed.result().unwrap()["wallets"].as_array().unwrap().clone();
    assert_eq!(wallets.len(), 2);
    assert!(wallets.iter().any(|w| w["name"] == "dev"));
}

#[tokio::test]
async fn test_bad_private_key() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke("eth_importWallet", json!({ "privateKey": "0xnothex" }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert_eq!(details(&envelope)["errors"][0]["field"], "privateKey");
}

#[tokio::test]
async fn test_send_requires_managed_wallet() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke("eth_sendTransaction", json!({ "from": ALICE, "to": BOB, "value": "1" }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::WalletNotFound));
}

#[tokio::test]
async fn test_send_nonce_too_low() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = managed_wallet(&d).await;
    chain.set_nonce(from.parse().unwrap(), 5);

    let envelope = d
        .invoke("eth_sendTransaction", json!({ "from": from, "to": BOB, "nonce": 2 }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::NonceTooLow));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_send_gas_too_low() {
    let chain = MockChain::new();
    chain.set_gas_estimate(50_000);
    let d = dispatcher(chain.clone(), false);
    let from = managed_wallet(&d).await;

    let envelope = d
        .invoke("eth_sendTransaction", json!({ "from": from, "to": BOB, "gas": 30_000 }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::GasTooLow));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_send_insufficient_funds() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = managed_wallet(&d).await;

    let envelope = d
        .invoke("eth_sendTransaction", json!({ "from": from, "to": BOB, "value": "1000" }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InsufficientFunds));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_send_signs_and_broadcasts() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = managed_wallet(&d).await;
    chain.set_nonce(from.parse().unwrap(), 3);
    chain.set_balance(from.parse().unwrap(), U256::from(10u64).pow(U256::from(18u64)));

    let envelope = d
        .invoke(
            "eth_sendTransaction",
            json!({ "from": from, "to": BOB, "value": "0x3e8", "gasPrice": 1_000_000_000u64 }),
        )
        .await;
    assert!(envelope.is_success(), "{}", envelope.to_json());
    let result = envelope.result().unwrap();
    assert_eq!(result["nonce"], 3);
    assert!(result["transactionHash"].as_str().unwrap().starts_with("0x"));
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test]
async fn test_send_raw_rejects_empty() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke("eth_sendRawTransaction", json!({ "signedTransaction": "0x" }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
}

#[tokio::test]
async fn test_reverted_receipt_is_failure() {
    let chain = MockChain::new();
    let tx = transfer(1, Address::repeat_byte(0x11), Address::repeat_byte(0x22), 1);
    chain.add_receipt(receipt(tx.hash, false));
    let d = dispatcher(chain, false);

    let envelope = d
        .invoke("eth_waitForReceipt", json!({ "hash": tx.hash.to_string() }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::TransactionFailed));
    assert_eq!(details(&envelope)["transaction_hash"], tx.hash.to_string());
}

#[tokio::test]
async fn test_receipt_wait_times_out() {
    let d = dispatcher(MockChain::new(), false);
    let hash = transfer(9, Address::ZERO, Address::ZERO, 0).hash;

    let envelope = d
        .invoke("eth_waitForReceipt", json!({ "hash": hash.to_string() }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::TransactionFailed));
    assert_eq!(details(&envelope)["transaction_hash"], hash.to_string());
}

#[tokio::test]
async fn test_mined_receipt() {
    let chain = MockChain::new();
    let hash = transfer(2, Address::ZERO, Address::ZERO, 0).hash;
    chain.add_receipt(receipt(hash, true));
    let d = dispatcher(chain, false);

    let envelope = d
        .invoke("eth_getTransactionReceipt", json!({ "hash": hash.to_string() }))
        .await;
    assert!(envelope.is_success());
}

#[tokio::test]
async fn test_unknown_transaction() {
    let d = dispatcher(MockChain::new(), false);
    let hash = transfer(3, Address::ZERO, Address::ZERO, 0).hash;

    let envelope = d
        .invoke("eth_getTransaction", json!({ "hash": hash.to_string() }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::TransactionNotFound));
    assert_eq!(details(&envelope)["transaction_hash"], hash.to_string());
}

#[tokio::test]
async fn test_missing_block_is_invalid_parameters() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d.invoke("eth_getBlock", json!({ "block": 5000 })).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
}

#[tokio::test]
async fn test_history_filters_by_address() {
    let chain = MockChain::new();
    let alice = Address::repeat_byte(0x11);
    let bob = Address::repeat_byte(0x22);
    let carol = Address::repeat_byte(0x33);
    chain.mine(95, vec![transfer(1, alice, bob, 1), transfer(2, bob, carol, 1)]);
    chain.mine(97, vec![transfer(3, carol, alice, 1)]);
    let d = dispatcher(chain, false);

    let envelope = d
        .invoke(
            "eth_getTransactionHistory",
            json!({ "address": ALICE, "startBlock": 90, "endBlock": 100 }),
        )
        .await;
    let result = envelope.result().unwrap();
    assert_eq!(result["count"], 2);
    let blocks: Vec<u64> = result["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tx| tx["blockNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(blocks, vec![95, 97]);
}

#[tokio::test]
async fn test_history_range_limit() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke(
            "eth_getTransactionHistory",
            json!({ "address": ALICE, "startBlock": 0, "endBlock": 500 }),
        )
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert_eq!(details(&envelope)["parameter_name"], "endBlock");
}

#[tokio::test]
async fn test_history_full_u64_range_is_rejected() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke(
            "eth_getTransactionHistory",
            json!({ "address": ALICE, "startBlock": 0, "endBlock": u64::MAX }),
        )
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert_eq!(details(&envelope)["parameter_name"], "endBlock");
}

#[tokio::test]
async fn test_gas_price_estimate_tiers() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d.invoke("eth_getGasPriceEstimate", json!({})).await;
    let result = envelope.result().unwrap();
    assert_eq!(result["baseFee"], "1000000000");
    assert_eq!(result["slow"], "1100000000");
    assert_eq!(result["instant"], "1400000000");
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let chain = MockChain::new();
    chain.panic_on_gas_price();
    let d = dispatcher(chain, false);

    let envelope = d.invoke("eth_getGasPrice", json!({})).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InternalError));
    assert_eq!(envelope.error_body().unwrap()["message"], "Internal server error");
    assert!(details(&envelope).get("exception_type").is_none());
}

#[tokio::test]
async fn test_debug_exposes_exception() {
    let chain = MockChain::new();
    chain.panic_on_gas_price();
    let d = dispatcher(chain, true);

    let envelope = d.invoke("eth_getGasPrice", json!({})).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InternalError));
    let details = details(&envelope);
    assert!(details["exception_message"]
        .as_str()
        .unwrap()
        .contains("gas oracle exploded"));
}

#[tokio::test]
async fn test_unreachable_node_is_internal_error() {
    let chain = MockChain::new();
    chain.set_unreachable(true);
    let d = dispatcher(chain, false);

    let envelope = d.invoke("eth_getBlockNumber", json!({})).await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InternalError));
    assert!(envelope.http_status().is_server_error());
}

#[tokio::test]
async fn test_context_is_cleared() {
    let chain = MockChain::new();
    chain.panic_on_gas_price();
    let d = dispatcher(chain, false);

    d.invoke("eth_getBlockNumber", json!({})).await;
    d.invoke("eth_getGasPrice", json!({})).await;
    d.invoke("eth_bogus", json!({})).await;
    d.invoke("eth_getBalance", json!({ "address": "nope" })).await;
    assert!(d.context().is_empty());
}

#[tokio::test]
async fn test_contract_unknown_address() {
    let d = dispatcher(MockChain::new(), false);

    let envelope = d
        .invoke(
            "contract_read",
            json!({ "contractAddress": ALICE, "method": "balanceOf" }),
        )
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::ContractNotFound));
}

#[tokio::test]
async fn test_contract_load_and_unknown_method() {
    let d = dispatcher(MockChain::new(), false);
    let abi = json!([{
        "type": "function",
        "name": "balanceOf",
        "stateMutability": "view",
        "inputs": [{ "name": "owner", "type": "address" }],
        "outputs": [{ "name": "", "type": "uint256" }]
    }]);

    let loaded = d
        .invoke("contract_load", json!({ "address": ALICE, "abi": abi, "name": "token" }))
        .await;
    assert!(loaded.is_success(), "{}", loaded.to_json());

    let listed = d.invoke("contract_list", json!({})).await;
    assert_eq!(listed.result().unwrap()["contracts"].as_array().unwrap().len(), 1);

    let envelope = d
        .invoke("contract_read", json!({ "contractAddress": ALICE, "method": "totalSupply" }))
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::MethodNotFound));
}

#[tokio::test]
async fn test_stream_chunks_history() {
    let chain = MockChain::new();
    let alice = Address::repeat_byte(0x11);
    let bob = Address::repeat_byte(0x22);
    for n in 0..5u64 {
        chain.mine(91 + n, vec![transfer(n, alice, bob, n)]);
    }
    let d = dispatcher(chain, false);

    let stream = d
        .open_stream(
            "eth_getTransactionHistory",
            json!({ "address": ALICE, "startBlock": 90, "endBlock": 100 }),
            2,
        )
        .await
        .unwrap();
    let frames: Vec<Value> = stream.frames().collect().await;

    assert_eq!(frames.first().unwrap()["metadata"]["stream_start"], true);
    let sizes: Vec<u64> = frames
        .iter()
        .filter_map(|f| f.get("chunk_metadata"))
        .map(|m| m["chunk_size"].as_u64().unwrap())
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    let end = &frames.last().unwrap()["metadata"];
    assert_eq!(end["stream_end"], true);
    assert_eq!(end["total_items"], 5);
}

#[tokio::test]
async fn test_stream_rejects_other_methods() {
    let d = dispatcher(MockChain::new(), false);

    let rejected = d.open_stream("eth_getBalance", json!({ "address": ALICE }), 10).await;
    match rejected {
        Err(envelope) => assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters)),
        Ok(_) => panic!("only history streams"),
    }
}

#[tokio::test]
async fn test_stream_batch_size_bounds() {
    let d = dispatcher(MockChain::new(), false);
    let params = json!({ "address": ALICE, "startBlock": 90, "endBlock": 100 });

    for batch_size in [0, 51, 1 << 50] {
        match d
            .open_stream("eth_getTransactionHistory", params.clone(), batch_size)
            .await
        {
            Err(envelope) => {
                assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
                assert_eq!(details(&envelope)["parameter_name"], "batchSize");
            }
            Ok(_) => panic!("batch size {} accepted", batch_size),
        }
    }
    assert!(d
        .open_stream("eth_getTransactionHistory", params, 50)
        .await
        .is_ok());
}

fn token_abi() -> Value {
    json!([
        {
            "type": "function",
            "name": "transfer",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "to", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ],
            "outputs": [{ "name": "", "type": "bool" }]
        },
        {
            "type": "event",
            "name": "Transfer",
            "anonymous": false,
            "inputs": [
                { "name": "from", "type": "address", "indexed": true },
                { "name": "to", "type": "address", "indexed": true },
                { "name": "value", "type": "uint256", "indexed": false }
            ]
        }
    ])
}

async fn funded_wallet(chain: &MockChain, d: &eth_rpc_gateway::Dispatcher) -> String {
    let from = managed_wallet(d).await;
    chain.set_balance(from.parse().unwrap(), U256::from(10u64).pow(U256::from(18u64)));
    from
}

#[tokio::test]
async fn test_estimate_gas_and_count() {
    let chain = MockChain::new();
    chain.set_gas_estimate(53_000);
    chain.set_nonce(Address::repeat_byte(0x11), 9);
    let d = dispatcher(chain, false);

    let gas = d.invoke("eth_estimateGas", json!({ "to": BOB, "value": 1 })).await;
    assert_eq!(gas.result().unwrap()["gas"], 53_000);

    let count = d
        .invoke("eth_getTransactionCount", json!({ "address": ALICE, "block": "pending" }))
        .await;
    let count = count.result().unwrap();
    assert_eq!(count["count"], 9);
    assert_eq!(count["block"], "pending");
}

#[tokio::test]
async fn test_contract_deploy_registers_address() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = funded_wallet(&chain, &d).await;
    chain.set_nonce(from.parse().unwrap(), 4);

    let envelope = d
        .invoke(
            "contract_deploy",
            json!({ "bytecode": "0x60806040", "abi": token_abi(), "from": from }),
        )
        .await;
    assert!(envelope.is_success(), "{}", envelope.to_json());

    let sender: Address = from.parse().unwrap();
    let expected = sender.create(4).to_checksum(None);
    assert_eq!(envelope.result().unwrap()["contractAddress"], expected.as_str());
    assert_eq!(chain.sent().len(), 1);

    let listed = d.invoke("contract_list", json!({})).await;
    let contracts = listed.result().unwrap()["contracts"].as_array().unwrap().clone();
    assert_eq!(contracts[0]["address"], expected.as_str());
}

#[tokio::test]
async fn test_contract_call_broadcasts() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = funded_wallet(&chain, &d).await;
    d.invoke("contract_load", json!({ "address": ALICE, "abi": token_abi() }))
        .await;

    let envelope = d
        .invoke(
            "contract_call",
            json!({
                "contractAddress": ALICE,
                "method": "transfer",
                "args": [BOB, "5"],
                "from": from
            }),
        )
        .await;
    assert!(envelope.is_success(), "{}", envelope.to_json());
    assert_eq!(envelope.result().unwrap()["method"], "transfer");
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test]
async fn test_contract_call_bad_args() {
    let chain = MockChain::new();
    let d = dispatcher(chain.clone(), false);
    let from = funded_wallet(&chain, &d).await;
    d.invoke("contract_load", json!({ "address": ALICE, "abi": token_abi() }))
        .await;

    let envelope = d
        .invoke(
            "contract_call",
            json!({ "contractAddress": ALICE, "method": "transfer", "args": [BOB], "from": from }),
        )
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_contract_events() {
    let d = dispatcher(MockChain::new(), false);
    d.invoke("contract_load", json!({ "address": ALICE, "abi": token_abi() }))
        .await;

    let envelope = d
        .invoke(
            "contract_getEvents",
            json!({ "contractAddress": ALICE, "eventName": "Transfer", "filters": { "from": BOB } }),
        )
        .await;
    assert!(envelope.is_success(), "{}", envelope.to_json());
    assert_eq!(envelope.result().unwrap()["events"], json!([]));

    let missing = d
        .invoke("contract_getEvents", json!({ "contractAddress": ALICE, "eventName": "Approval" }))
        .await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::InvalidParameters));
}
