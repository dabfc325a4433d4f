//! Axum REST API handlers.

use std::sync::Arc;

use aid_ledger::{
    AidLedger, AidRequest, Amount, Donation, LedgerStats, LoggedTransaction,
    MemoryTransactionLog, NewAidRequest, Wallet, WalletSession, WalletSnapshot,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, Result};

pub struct ApiState {
    pub ledger: AidLedger,
    pub wallet: Arc<WalletSession>,
    pub tx_log: Arc<MemoryTransactionLog>,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/donations", post(donate))
        .route("/donations", get(list_donations))
        .route("/users/:address/requests", get(user_requests))
        .route("/users/:address/donations", get(user_donations))
        .route("/transactions", get(list_transactions))
        .route("/wallet", get(wallet))
        .route("/wallet/connect", post(connect_wallet))
        .route("/wallet/disconnect", post(disconnect_wallet))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub busy: bool,
    pub last_error: Option<String>,
    pub revision: u64,
    pub stats: LedgerStats,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        ListResponse {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DonateBody {
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonatedResponse {
    pub transaction_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    pub address: String,
    pub balance: Option<Amount>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /status`
///
/// Busy flag, last write error and a summary of the ledger.
pub async fn status(State(state): State<Arc<ApiState>>) -> Result<Json<StatusResponse>> {
    Ok(Json(StatusResponse {
        busy: state.ledger.is_busy(),
        last_error: state.ledger.last_error(),
        revision: state.ledger.revision(),
        stats: state.ledger.stats().await?,
    }))
}

/// `GET /requests`
pub async fn list_requests(State(state): State<Arc<ApiState>>) -> Json<ListResponse<AidRequest>> {
    Json(state.ledger.requests().await.into())
}

/// `GET /requests/:id`
pub async fn get_request(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<AidRequest>> {
    state
        .ledger
        .get_request_by_id(&id)
        .await
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("aid request {id}")))
}

/// `POST /requests`
///
/// Opens a request for the connected wallet; answers once the simulated
/// transaction has been confirmed.
pub async fn create_request(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewAidRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.ledger.create_request(body).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `POST /requests/:id/donations`
pub async fn donate(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<DonateBody>,
) -> Result<(StatusCode, Json<DonatedResponse>)> {
    let transaction_hash = state.ledger.donate_to_request(&id, &body.amount).await?;
    Ok((StatusCode::CREATED, Json(DonatedResponse { transaction_hash })))
}

/// `GET /donations`
pub async fn list_donations(State(state): State<Arc<ApiState>>) -> Json<ListResponse<Donation>> {
    Json(state.ledger.donations().await.into())
}

/// `GET /users/:address/requests`
pub async fn user_requests(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Json<ListResponse<AidRequest>> {
    Json(state.ledger.get_user_requests(&address).await.into())
}

/// `GET /users/:address/donations`
pub async fn user_donations(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Json<ListResponse<Donation>> {
    Json(state.ledger.get_user_donations(&address).await.into())
}

/// `GET /transactions`
pub async fn list_transactions(
    State(state): State<Arc<ApiState>>,
) -> Json<ListResponse<LoggedTransaction>> {
    Json(state.tx_log.entries().await.into())
}

/// `GET /wallet`
pub async fn wallet(State(state): State<Arc<ApiState>>) -> Json<WalletSnapshot> {
    Json(state.wallet.snapshot())
}

/// `POST /wallet/connect`
pub async fn connect_wallet(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ConnectBody>,
) -> Result<Json<WalletSnapshot>> {
    if body.address.trim().is_empty() {
        return Err(GatewayError::BadRequest("address must not be empty".to_string()));
    }
    let balance = body.balance.unwrap_or_else(Amount::zero);
    Ok(Json(state.wallet.connect(body.address.trim(), balance)))
}

/// `POST /wallet/disconnect`
pub async fn disconnect_wallet(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.wallet.disconnect();
    StatusCode::NO_CONTENT
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
