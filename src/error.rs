//! Application error types and result alias.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Download code not present in the ledger
    #[error("Invalid download code")]
    InvalidCode,

    /// Order exists but has already been exhausted
    #[error("Download code already used")]
    CodeAlreadyUsed,

    /// Requested image is not part of the order
    #[error("Image '{0}' not found in order")]
    ItemNotInOrder(String),

    /// Paid asset reference absent on the order item
    #[error("HQ asset missing for image '{0}'")]
    HqAssetMissing(String),

    /// Storage/signing backend failure or timeout; transient
    #[error("Signing backend unavailable: {0}")]
    SigningUnavailable(String),

    /// Storage error (bad object reference, unresolvable path)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address parse error
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database operation failed".to_string(),
            ),
            AppError::Migration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MIGRATION_ERROR",
                "Database migration failed".to_string(),
            ),
            AppError::InvalidCode => (
                StatusCode::NOT_FOUND,
                "INVALID_CODE",
                "Invalid download code".to_string(),
            ),
            AppError::CodeAlreadyUsed => (
                StatusCode::FORBIDDEN,
                "CODE_ALREADY_USED",
                "This download code has already been used. Please contact support if you need assistance."
                    .to_string(),
            ),
            AppError::ItemNotInOrder(_) => (
                StatusCode::NOT_FOUND,
                "ITEM_NOT_IN_ORDER",
                "Image not found in order".to_string(),
            ),
            AppError::HqAssetMissing(_) => (
                StatusCode::NOT_FOUND,
                "HQ_ASSET_MISSING",
                "HQ image not available for this item".to_string(),
            ),
            AppError::SigningUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SIGNING_UNAVAILABLE",
                "Could not generate download URL, please retry".to_string(),
            ),
            AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage operation failed".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                "IO operation failed".to_string(),
            ),
            AppError::AddrParse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ADDR_PARSE_ERROR",
                "Invalid address".to_string(),
            ),
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "JSON_ERROR",
                "Invalid JSON".to_string(),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        // Log the error
        tracing::error!(error = %self, code = code, "Request error");

        let body = Json(json!({
            "success": false,
            "code": code,
            "error": message,
        }));

        (status, body).into_response()
    }
}
