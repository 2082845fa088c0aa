use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ethers_core::types::H256;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics;
use crate::chat::{self, ChatClient};
use crate::eth::{EthClient, HashResolution};
use crate::models::WhaleTransaction;
use crate::search::{self, SearchKind};
use crate::store::{SearchHistory, WhaleStore};
use crate::units::wei_to_eth;

/// Upper bound on any block window a request can ask for.
const MAX_BLOCK_WINDOW: u64 = 200;

#[derive(Clone)]
pub struct AppState {
    pub client: EthClient,
    pub whales: WhaleStore,
    pub searches: SearchHistory,
    pub chat: Option<ChatClient>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats/analytics", get(analytics_summary))
        .route("/whales/live", get(live_whales))
        .route(
            "/whales/saved",
            get(saved_whales).post(save_whale).delete(clear_saved_whales),
        )
        .route("/search", get(run_search))
        .route("/search/recent", get(recent_searches))
        .route("/blocks/recent", get(recent_blocks))
        .route("/block/:number", get(block_by_number))
        .route("/tx/:hash", get(transaction_by_hash))
        .route("/address/:address", get(address_overview))
        .route("/chat", post(chat_message))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("upstream request failed: {:#}", err);
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: "upstream RPC request failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct AnalyticsParams {
    #[serde(default = "default_analytics_blocks")]
    blocks: u64,
}

fn default_analytics_blocks() -> u64 {
    50
}

async fn analytics_summary(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult {
    let blocks = state
        .client
        .fetch_recent_blocks(params.blocks.min(MAX_BLOCK_WINDOW))
        .await?;
    // `null` means "no data yet"; an all-zero summary only ever comes out
    // of a non-empty batch.
    let summary = (!blocks.is_empty()).then(|| analytics::aggregate(&blocks));
    Ok(Json(json!({ "analytics": summary })))
}

#[derive(Deserialize)]
struct WhaleParams {
    #[serde(default = "default_whale_blocks")]
    blocks: u64,
    #[serde(default = "default_min_value")]
    min_value: f64,
}

fn default_whale_blocks() -> u64 {
    30
}

fn default_min_value() -> f64 {
    analytics::LARGE_THRESHOLD_ETH
}

async fn live_whales(
    State(state): State<AppState>,
    Query(params): Query<WhaleParams>,
) -> ApiResult {
    let blocks = state
        .client
        .fetch_recent_blocks(params.blocks.min(MAX_BLOCK_WINDOW))
        .await?;
    let whales = analytics::collect_whales(&blocks, params.min_value);
    Ok(Json(json!({ "count": whales.len(), "whales": whales })))
}

async fn saved_whales(State(state): State<AppState>) -> ApiResult {
    Ok(Json(json!({ "whales": state.whales.list() })))
}

async fn save_whale(
    State(state): State<AppState>,
    Json(whale): Json<WhaleTransaction>,
) -> ApiResult {
    let saved = state.whales.save(&whale);
    Ok(Json(json!({ "saved": saved })))
}

async fn clear_saved_whales(State(state): State<AppState>) -> ApiResult {
    state.whales.clear();
    Ok(Json(json!({ "cleared": true })))
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

async fn run_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    let kind = search::detect(&params.q);

    let result = match &kind {
        SearchKind::BlockNumber(number) => {
            match state.client.block_by_number(*number, false).await? {
                Some(block) => json!({ "type": "block", "block": block }),
                None => return Err(ApiError::not_found("block not found")),
            }
        }
        SearchKind::Address(address) => {
            let balance = state.client.balance(address).await?;
            let tx_count = state.client.transaction_count(address).await?;
            json!({
                "type": "address",
                "address": address,
                "balance_wei": balance.to_string(),
                "balance_eth": wei_to_eth(balance),
                "tx_count": tx_count,
            })
        }
        SearchKind::Hash(hash) => {
            let hash: H256 = hash
                .parse()
                .map_err(|_| ApiError::bad_request("malformed hash"))?;
            match state.client.resolve_hash(hash).await? {
                HashResolution::Transaction(tx) => {
                    json!({ "type": "transaction", "transaction": tx })
                }
                HashResolution::Block(block) => json!({ "type": "block", "block": block }),
                HashResolution::NotFound => {
                    return Err(ApiError::not_found("hash matches no transaction or block"))
                }
            }
        }
        SearchKind::Unknown => return Err(ApiError::bad_request("unrecognized query")),
    };

    state.searches.record(params.q.trim(), kind.label());
    Ok(Json(result))
}

async fn recent_searches(State(state): State<AppState>) -> ApiResult {
    Ok(Json(json!({ "searches": state.searches.recent() })))
}

#[derive(Deserialize)]
struct RecentBlocksParams {
    #[serde(default = "default_recent_blocks")]
    limit: u64,
}

fn default_recent_blocks() -> u64 {
    10
}

async fn recent_blocks(
    State(state): State<AppState>,
    Query(params): Query<RecentBlocksParams>,
) -> ApiResult {
    let blocks = state
        .client
        .fetch_recent_blocks(params.limit.min(MAX_BLOCK_WINDOW))
        .await?;
    Ok(Json(json!({ "blocks": blocks })))
}

async fn block_by_number(State(state): State<AppState>, Path(number): Path<String>) -> ApiResult {
    let number = parse_block_number(&number)
        .ok_or_else(|| ApiError::bad_request("malformed block number"))?;
    match state.client.block_by_number(number, true).await? {
        Some(block) => Ok(Json(json!({ "block": block }))),
        None => Err(ApiError::not_found("block not found")),
    }
}

async fn transaction_by_hash(State(state): State<AppState>, Path(hash): Path<String>) -> ApiResult {
    let hash: H256 = hash
        .parse()
        .map_err(|_| ApiError::bad_request("malformed transaction hash"))?;
    match state.client.transaction_by_hash(hash).await? {
        Some(tx) => Ok(Json(json!({ "transaction": tx }))),
        None => Err(ApiError::not_found("transaction not found")),
    }
}

async fn address_overview(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult {
    let SearchKind::Address(address) = search::detect(&address) else {
        return Err(ApiError::bad_request("malformed address"));
    };
    let balance = state.client.balance(&address).await?;
    let tx_count = state.client.transaction_count(&address).await?;
    Ok(Json(json!({
        "address": address,
        "balance_wei": balance.to_string(),
        "balance_eth": wei_to_eth(balance),
        "tx_count": tx_count,
    })))
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult {
    let Some(chat_client) = &state.chat else {
        return Err(ApiError::unavailable("chat assistant is not configured"));
    };
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }

    let live_context = chat::live_chain_context(&state.client).await;
    let response = chat_client.respond(&request.message, &live_context).await?;
    Ok(Json(json!({ "response": response })))
}

fn parse_block_number(raw: &str) -> Option<u64> {
    if let Some(hex) = raw.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_number_accepts_decimal_and_hex() {
        assert_eq!(parse_block_number("17"), Some(17));
        assert_eq!(parse_block_number("0x11"), Some(17));
        assert_eq!(parse_block_number("latest"), None);
    }
}
