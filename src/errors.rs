//! Error types and their HTTP mapping.
//!
//! One `AppError` enum covers startup and request-time failures. Startup
//! errors abort the process in `main`; request-time errors render as a JSON
//! `{"detail": ...}` body with the status from `status_code`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Unprocessable { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Ingestion error: {message}")]
    Ingestion { message: String },

    #[error("Chunking error: {message}")]
    Chunking { message: String },

    #[error("Embedding provider error: {message}")]
    Embedding { message: String },

    #[error("LLM provider error: {message}")]
    Generation { message: String },

    #[error("Vector index error: {message}")]
    Index { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// HTTP status this error renders as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // Everything else surfaces as an internal failure; the detail
            // string carries the cause. Provider errors are not retried.
            AppError::Configuration { .. }
            | AppError::Ingestion { .. }
            | AppError::Chunking { .. }
            | AppError::Embedding { .. }
            | AppError::Generation { .. }
            | AppError::Index { .. }
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Wire shape of every error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %detail, status = status.as_u16(), "request failed");
        } else if self.is_client_error() {
            tracing::warn!(error = %detail, status = status.as_u16(), "request rejected");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
