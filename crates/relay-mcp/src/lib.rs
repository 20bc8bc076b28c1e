//! Relay MCP - the agent side of the Telegram relay.
//!
//! [`RelayMcpServer`] implements `rmcp`'s `ServerHandler` with five tools:
//!
//! - `request_approval`: Approve/Deny buttons, waits for the click
//! - `send_prompt`: a question, waits for the next free-text reply
//! - `notify`: one-way notification with a priority marker
//! - `get_pending_messages`: read (and by default drain) queued chat input
//! - `send_message`: one-way message
//!
//! The same server runs over stdio ([`RelayMcpServer::run_stdio`]) or, per
//! session, over any `AsyncRead`/`AsyncWrite` pair such as the gateway's
//! SSE bridge.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod params;
pub mod server;

pub use params::{
    GetPendingMessagesParams, NotifyParams, PriorityParam, RequestApprovalParams,
    SendMessageParams, SendPromptParams,
};
pub use server::{
    GET_PENDING_MESSAGES, NOTIFY, REQUEST_APPROVAL, RelayMcpServer, SEND_MESSAGE, SEND_PROMPT,
};
