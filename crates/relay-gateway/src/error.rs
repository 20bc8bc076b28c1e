//! Gateway errors and their HTTP mapping.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_telegram::TelegramError;
use thiserror::Error;

/// Errors produced by the HTTP surface.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `POST /messages` without a `sessionId` query parameter.
    #[error("Missing sessionId")]
    MissingSession,

    /// No open SSE session with that id.
    #[error("Session not found")]
    SessionNotFound,

    /// Body was not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Webhook body was not a Telegram update.
    #[error("{0}")]
    InvalidUpdate(#[from] TelegramError),

    /// Listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Server failed while running.
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Convenience alias.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSession | Self::InvalidJson(_) | Self::InvalidUpdate(_) => {
                StatusCode::BAD_REQUEST
            },
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Bind { .. } | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
