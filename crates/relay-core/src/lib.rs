//! Relay Core - the state shared between the chat side and the agent side.
//!
//! This crate provides:
//! - The inbound [`MessageQueue`] of user messages awaiting the agent
//! - Command parsing and routing for `/quest`, `/chat`, `/help` and `/status`
//! - The [`PendingTable`] correlating button clicks and free-text replies
//!   with the tool call waiting for them
//! - Pure formatters for chat message bodies and tool-call payloads
//! - The [`ChatTransport`] seam implemented by the Telegram frontend
//! - The [`Relay`] context object that owns all of the above and implements
//!   every inbound event handler and tool operation

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod command;
pub mod error;
pub mod format;
pub mod pending;
pub mod queue;
pub mod relay;
pub mod result;
pub mod transport;

pub use command::{
    CommandResult, CommandRouter, CommandType, ParsedCommand, get_command_type, handle_command,
    parse_command,
};
pub use error::{RelayError, RelayResult};
pub use format::{
    PendingMessageView, PendingMessages, Priority, escape_markdown, format_pending_messages,
};
pub use pending::{
    Completion, PendingRequest, PendingTable, Reply, RequestKind, generate_request_id,
};
pub use queue::{MessageQueue, QueuedMessage, now_millis};
pub use relay::{
    CallbackOutcome, ConnectionGuard, DeliveryMode, InboundOutcome, Relay, RelaySettings,
};
pub use result::ToolResult;
pub use transport::{
    Button, CallbackOrigin, ChatId, ChatTransport, InboundCallback, InboundText, Markup,
    OutgoingMessage, SentMessage,
};
