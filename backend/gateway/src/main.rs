//! Aid ledger gateway: entry point.
//!
//! Loads the aid-request ledger from SQLite, wires it to a simulated chain
//! and a single wallet session, and exposes the ledger's operations over a
//! small Axum REST API.

mod api;
mod config;
mod db;
mod errors;

use std::sync::Arc;

use aid_ledger::{
    AidLedger, Collaborators, LedgerOptions, MemoryTransactionLog, SimulatedChain, WalletSession,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::SqliteStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // ─── Ledger ───────────────────────────────────────────
    let wallet = Arc::new(WalletSession::new());
    let tx_log = Arc::new(MemoryTransactionLog::new());
    let ledger = AidLedger::load(
        Collaborators {
            storage: Arc::new(SqliteStorage::new(pool)),
            chain: Arc::new(SimulatedChain::new(config.chain_latency)),
            wallet: wallet.clone(),
            tx_log: tx_log.clone(),
        },
        LedgerOptions {
            seed_when_empty: config.seed_demo_data,
        },
    )
    .await?;
    info!(
        "Ledger ready with {} requests (chain latency {:?})",
        ledger.requests().await.len(),
        config.chain_latency
    );

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        ledger,
        wallet,
        tx_log,
    });

    let app = api::router(api_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
