//! Relay Telegram - the Telegram side of the MCP relay.
//!
//! - [`TelegramTransport`]: [`relay_core::ChatTransport`] over the Bot API,
//!   rendering relay Markdown to Telegram HTML and splitting long texts.
//! - [`Poller`]: long-polling dispatcher feeding updates to a
//!   [`relay_core::Relay`].
//! - [`set_webhook`] / [`delete_webhook`] / [`dispatch_update`]: webhook
//!   delivery, with the HTTP side living in the gateway.
//! - [`verify`]: connectivity self-check.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bot;
pub mod error;
pub mod format;
pub mod transport;
pub mod update;
pub mod verify;

pub use bot::{Poller, build_bot, delete_webhook, set_webhook};
pub use error::{TelegramError, TelegramResult};
pub use format::{MAX_MESSAGE_CHARS, fit_message, html_escape, markdown_to_html, split_message};
pub use transport::TelegramTransport;
pub use update::{dispatch_update, inbound_callback, inbound_text, parse_update};
pub use verify::{CheckOutcome, queue_self_check, verify};

/// Re-exported so callers need not depend on teloxide directly.
pub use teloxide::{Bot, types::Update};
