//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::providers::Provider;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    InvalidBody { message: String },

    #[error("Request size exceeds maximum of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{provider} API request timeout after {timeout_ms}ms")]
    Timeout { provider: Provider, timeout_ms: u64 },

    #[error("{provider} API error: {status} - {body}")]
    Upstream {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: msg.into(),
        }
    }

    /// HTTP status surfaced to the caller when this error is terminal.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Invalid payload format",
            Self::InvalidBody { .. } => "Invalid request body",
            Self::PayloadTooLarge { .. } => "Request entity too large",
            Self::Config { .. } => "Configuration error",
            _ => "Proxy Error",
        }
    }

    /// Message placed in the `details` field of the error body.
    fn details(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::InvalidBody { message }
            | Self::Config { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Body shape shared by every error the relay returns.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(self.category(), self.details());
        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
