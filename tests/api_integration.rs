use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use ethers_core::types::U256;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use whale_watch::api::{app_router, AppState};
use whale_watch::eth::EthClient;
use whale_watch::store::{KvStore, MemoryStore, SearchHistory, WhaleStore};

const ADDR_A: &str = "0x00000000000000000000000000000000000000aa";
const ADDR_B: &str = "0x00000000000000000000000000000000000000bb";

fn eth_wei_hex(amount: u64) -> String {
    format!("0x{:x}", U256::from(amount) * U256::exp10(18))
}

fn block_hash(number: u64) -> String {
    format!("0x{:064x}", number)
}

fn tx_hash(n: u64) -> String {
    format!("0x{:064x}", 0xabc0 + n)
}

fn tx_json(n: u64, value_wei_hex: &str) -> Value {
    json!({
        "hash": tx_hash(n),
        "from": ADDR_A,
        "to": ADDR_B,
        "value": value_wei_hex,
        "gas": "0x5208",
        "gasPrice": "0x3b9aca00",
        "nonce": format!("0x{:x}", n),
        "input": "0x",
    })
}

fn block_json(number: u64, timestamp: u64, txs: Value) -> Value {
    json!({
        "number": format!("0x{:x}", number),
        "hash": block_hash(number),
        "parentHash": block_hash(number.saturating_sub(1)),
        "miner": "0x0000000000000000000000000000000000000001",
        "gasUsed": "0x5208",
        "gasLimit": "0x1c9c380",
        "size": "0x220",
        "timestamp": format!("0x{:x}", timestamp),
        "transactions": txs,
    })
}

/// Three blocks, newest first: 18 carries a mega and a large whale plus a
/// small transfer, 17 is quiet, 16 has one ordinary transfer.
fn chain_fixture() -> Vec<Value> {
    vec![
        block_json(
            18,
            1010,
            json!([
                tx_json(1, &eth_wei_hex(120_000)),
                tx_json(2, &eth_wei_hex(15_000)),
                tx_json(3, &eth_wei_hex(2)),
            ]),
        ),
        block_json(17, 1000, json!([])),
        block_json(16, 990, json!([tx_json(4, &eth_wei_hex(1))])),
    ]
}

async fn mock_rpc(Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default();
    let params = &request["params"];
    let blocks = chain_fixture();

    let result = match method {
        "eth_blockNumber" => json!("0x12"),
        "eth_getBlockByNumber" => {
            let tag = params[0].as_str().unwrap_or_default();
            blocks
                .iter()
                .find(|b| b["number"].as_str() == Some(tag))
                .cloned()
                .unwrap_or(Value::Null)
        }
        "eth_getBlockByHash" => {
            let hash = params[0].as_str().unwrap_or_default();
            blocks
                .iter()
                .find(|b| b["hash"].as_str() == Some(hash))
                .cloned()
                .unwrap_or(Value::Null)
        }
        "eth_getTransactionByHash" => {
            let hash = params[0].as_str().unwrap_or_default();
            blocks
                .iter()
                .filter_map(|b| b["transactions"].as_array())
                .flatten()
                .find(|t| t["hash"].as_str() == Some(hash))
                .cloned()
                .unwrap_or(Value::Null)
        }
        "eth_getBalance" => json!(eth_wei_hex(1)),
        "eth_getTransactionCount" => json!("0x5"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_chainId" => json!("0x1"),
        _ => Value::Null,
    };

    Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
}

async fn spawn_mock_rpc() -> (String, JoinHandle<()>) {
    let app = Router::new().route("/", post(mock_rpc));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), handle)
}

async fn spawn_app() -> (String, Vec<JoinHandle<()>>) {
    let (rpc_url, rpc_handle) = spawn_mock_rpc().await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let state = AppState {
        client: EthClient::new(&rpc_url).unwrap(),
        whales: WhaleStore::new(kv.clone()),
        searches: SearchHistory::new(kv),
        chat: None,
    };
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (base_url, vec![app_handle, rpc_handle])
}

fn abort_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn health_endpoint_works() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.get("status").and_then(|s| s.as_str()), Some("ok"));
    abort_all(handles);
}

#[tokio::test]
async fn analytics_covers_the_fixture_chain() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .get(format!("{}/stats/analytics?blocks=3", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    let summary = body.get("analytics").unwrap();
    assert!(!summary.is_null());

    assert_eq!(summary["total_tx_count"], json!(4));
    assert_eq!(summary["avg_block_time_secs"], json!(10.0));
    assert_eq!(summary["unique_addresses"], json!(2));

    // Newest-first input comes back as chronological-ascending rows.
    let numbers: Vec<u64> = summary["block_rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![16, 17, 18]);
    abort_all(handles);
}

#[tokio::test]
async fn live_whales_are_tiered_and_sorted() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .get(format!("{}/whales/live?blocks=3", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["count"], json!(2));
    let whales = body["whales"].as_array().unwrap();
    assert_eq!(whales[0]["size"], json!("mega"));
    assert_eq!(whales[0]["hash"], json!(tx_hash(1)));
    assert_eq!(whales[1]["size"], json!("large"));
    assert_eq!(whales[1]["block_number"], json!(18));
    abort_all(handles);
}

#[tokio::test]
async fn whale_filter_narrows_by_min_value() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .get(format!("{}/whales/live?blocks=3&min_value=100000", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["whales"][0]["size"], json!("mega"));
    abort_all(handles);
}

#[tokio::test]
async fn saved_whales_round_trip() {
    let (base_url, handles) = spawn_app().await;
    let client = Client::new();

    let whale = json!({
        "hash": tx_hash(2),
        "from": ADDR_A,
        "to": ADDR_B,
        "value_wei": "15000000000000000000000",
        "value_eth": 15_000.0,
        "timestamp": 1010,
        "block_number": 18,
        "size": "large",
    });

    let res = client
        .post(format!("{}/whales/saved", base_url))
        .json(&whale)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["saved"], json!(true));

    // Saving the same hash again is a no-op.
    let body: Value = client
        .post(format!("{}/whales/saved", base_url))
        .json(&whale)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["saved"], json!(false));

    let body: Value = client
        .get(format!("{}/whales/saved", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let saved = body["whales"].as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert!(saved[0]["saved_at"].is_i64());

    let body: Value = client
        .delete(format!("{}/whales/saved", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cleared"], json!(true));

    let body: Value = client
        .get(format!("{}/whales/saved", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["whales"].as_array().unwrap().is_empty());
    abort_all(handles);
}

#[tokio::test]
async fn search_resolves_address_and_records_history() {
    let (base_url, handles) = spawn_app().await;
    let client = Client::new();

    let res = client
        .get(format!("{}/search?q={}", base_url, ADDR_A))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["type"], json!("address"));
    assert_eq!(body["balance_eth"], json!(1.0));
    assert_eq!(body["tx_count"], json!(5));

    let body: Value = client
        .get(format!("{}/search/recent", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let searches = body["searches"].as_array().unwrap();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["query"], json!(ADDR_A));
    assert_eq!(searches[0]["kind"], json!("address"));
    abort_all(handles);
}

#[tokio::test]
async fn search_resolves_block_number_and_tx_hash() {
    let (base_url, handles) = spawn_app().await;
    let client = Client::new();

    let body: Value = client
        .get(format!("{}/search?q=18", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["type"], json!("block"));
    assert_eq!(body["block"]["number"], json!("0x12"));

    let body: Value = client
        .get(format!("{}/search?q={}", base_url, tx_hash(1)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["type"], json!("transaction"));
    assert_eq!(body["transaction"]["hash"], json!(tx_hash(1)));
    abort_all(handles);
}

#[tokio::test]
async fn search_rejects_garbage() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .get(format!("{}/search?q=not-a-thing", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    abort_all(handles);
}

#[tokio::test]
async fn block_and_tx_endpoints_return_records() {
    let (base_url, handles) = spawn_app().await;
    let client = Client::new();

    let body: Value = client
        .get(format!("{}/block/18", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["block"]["hash"], json!(block_hash(18)));

    let body: Value = client
        .get(format!("{}/tx/{}", base_url, tx_hash(2)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["transaction"]["hash"], json!(tx_hash(2)));

    // A hash no node knows about is a 404, not an error.
    let res = client
        .get(format!("{}/tx/0x{:064x}", base_url, 0xdead))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    abort_all(handles);
}

#[tokio::test]
async fn chat_without_key_is_unavailable() {
    let (base_url, handles) = spawn_app().await;
    let res = Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    abort_all(handles);
}
