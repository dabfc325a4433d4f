//! Application-wide error types and their HTTP mapping.

use aid_ledger::LedgerError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Ledger(LedgerError::NotConnected) => StatusCode::UNAUTHORIZED,
            GatewayError::Ledger(LedgerError::RequestNotFound(_)) | GatewayError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::Ledger(LedgerError::InvalidAmount(_)) | GatewayError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
