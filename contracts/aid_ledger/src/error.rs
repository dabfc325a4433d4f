//! Ledger-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// No wallet, address or signer is available for a write operation.
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Aid request not found: {0}")]
    RequestNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Anything raised while the simulated chain call is in flight.
    #[error("Transaction failed: {0}")]
    Chain(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
