/// Unified error types for SkySkins
use crate::{
    catalog::CatalogError,
    providers::{ProviderError, SkinSource},
    render::RenderError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed UUID or username
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Every provider in the chain failed; carries the last failure
    #[error("All {attempted} provider(s) failed, last error: {last}")]
    AllProvidersFailed {
        attempted: usize,
        last: ProviderError,
    },

    /// Aggregate endpoint exhausted its chain
    #[error("No provider produced an avatar: {0}")]
    Gateway(String),

    /// Texture reference resolved, but the texture itself could not be fetched
    #[error("Texture unavailable: {0}")]
    TextureUnavailable(String),

    /// Provider has no configuration (e.g. no base URL)
    #[error("Provider {0} is not configured")]
    ProviderDisabled(SkinSource),

    /// Skin decoding or avatar encoding failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Catalog store errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, "InvalidIdentifier"),
            AppError::AllProvidersFailed {
                last: ProviderError::NotFound(_),
                ..
            } => (StatusCode::NOT_FOUND, "NotFound"),
            AppError::AllProvidersFailed { .. } | AppError::Gateway(_) => {
                (StatusCode::BAD_GATEWAY, "UpstreamFailed")
            }
            AppError::TextureUnavailable(_) => (StatusCode::BAD_GATEWAY, "TextureUnavailable"),
            AppError::ProviderDisabled(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ProviderDisabled")
            }
            AppError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RenderFailed"),
            AppError::Catalog(_) | AppError::Config(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let message = match self {
            AppError::Catalog(_) | AppError::Config(_) | AppError::Internal(_) => {
                "Internal server error".to_string() // Don't leak details
            }
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "request_failed");
        } else {
            tracing::debug!(status = %status, error = %message, "request_rejected");
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for SkySkins operations
pub type AppResult<T> = Result<T, AppError>;
