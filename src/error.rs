//! Error types and Axum response conversions.

use crate::auth::AuthError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message returned for every failed verification, whatever the cause.
pub const AUTH_FAILED: &str = "Authentication failed";

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Default mapping of sign-in failures.
///
/// Expiry and mismatch collapse into one message so callers cannot tell
/// them apart.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidAddress(e) => AppError::BadRequest(format!("Invalid address: {}", e)),
            AuthError::NoPendingChallenge(_) => {
                AppError::NotFound("No pending challenge".to_string())
            }
            AuthError::ChallengeExpired(_) | AuthError::SignatureMismatch(_) => {
                AppError::Unauthorized(AUTH_FAILED.to_string())
            }
            AuthError::StorageUnavailable(e) => AppError::ServiceUnavailable(e.to_string()),
            e @ AuthError::ExpiryOutOfRange(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// Malformed request bodies get the same JSON error shape as everything else.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
            JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {}", e.body_text()),
            JsonRejection::MissingJsonContentType(e) => e.body_text(),
            _ => "Invalid JSON request".to_string(),
        };
        AppError::BadRequest(message)
    }
}
