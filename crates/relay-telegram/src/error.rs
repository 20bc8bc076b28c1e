//! Error types for the Telegram transport.

use relay_core::RelayError;
use thiserror::Error;

/// Errors produced by the Telegram side of the relay.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot API call failed.
    #[error("telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),

    /// A webhook body was not a Telegram update.
    #[error("invalid update payload: {0}")]
    InvalidUpdate(#[from] serde_json::Error),

    /// Webhook URL could not be parsed.
    #[error("invalid webhook URL '{url}': {message}")]
    InvalidWebhookUrl {
        /// The rejected URL.
        url: String,
        /// Parse failure.
        message: String,
    },
}

/// Convenience alias.
pub type TelegramResult<T> = Result<T, TelegramError>;

impl From<TelegramError> for RelayError {
    fn from(err: TelegramError) -> Self {
        RelayError::transport(err)
    }
}
