use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid mail")]
    Validation(String),

    #[error("Invalid refresh token")]
    InvalidRefresh,

    #[error("Refresh token expired")]
    RefreshExpired,

    #[error("Refresh token from the black list")]
    Blacklisted,

    #[error("Invalid access token")]
    InvalidAccess,

    #[error("Access token expired")]
    AccessExpired,

    #[error("Scope for the access token is invalid")]
    WrongScope,

    #[error("There is no code for this mail. Please request a new code.")]
    NoCodeForSubject,

    #[error("Invalid code. The current code for this mail has been reset. Please request a new code.")]
    InvalidCode,

    #[error("No connection to the database, a server restart is required")]
    StoreUnavailable,

    #[error("Database error: {0}")]
    Store(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Store-side failures, as opposed to a rejected credential or code.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AppError::StoreUnavailable | AppError::Store(_))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) => AppError::StoreUnavailable,
            other => AppError::Store(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_)
            | AppError::InvalidRefresh
            | AppError::RefreshExpired
            | AppError::Blacklisted
            | AppError::InvalidAccess
            | AppError::AccessExpired
            | AppError::WrongScope
            | AppError::NoCodeForSubject
            | AppError::InvalidCode => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable
            | AppError::Store(_)
            | AppError::Delivery(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let msg = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "store operation failed");
                "database error".to_string()
            }
            AppError::Delivery(e) => {
                tracing::error!(error = %e, "mail delivery failed");
                "mail delivery failed".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}
