//! Error types for ghgate
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` and renders the same
//! `{status, message}` envelope as every other outcome.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::{ApiMessage, PrettyJson};
use crate::auth::SessionError;

/// Application-wide error type
///
/// Upstream rejections (GitHub answering 401/403/404/422) are not errors:
/// they are translated into per-endpoint outcomes. This enum only covers
/// failures that abort a request before or around the upstream call.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client input error (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid session credential (401)
    #[error("Not authenticated")]
    Unauthorized,

    /// Session credential could not be verified (401)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Transport failure talking to GitHub (500)
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// GitHub answered with a body we could not decode (500)
    #[error("Failed to decode upstream response: {0}")]
    UpstreamDecode(#[from] serde_json::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and caller-facing message for this error.
    ///
    /// Internal details never leak into the message; they are logged instead.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized | AppError::Session(_) => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Upstream(_) | AppError::UpstreamDecode(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error".to_string(),
            ),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Session(_) => "session",
            AppError::Upstream(_) => "upstream",
            AppError::UpstreamDecode(_) => "upstream_decode",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        PrettyJson(status, ApiMessage::new(status, message)).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
