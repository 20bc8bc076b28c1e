//! Message body and payload builders.
//!
//! Chat bodies use light Markdown (`**bold**`, `*italic*`, `_italic_`,
//! fenced code); the transport decides how to render it.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::queue::QueuedMessage;
use crate::relay::DeliveryMode;

/// Maximum characters of approval context embedded in the chat message.
pub const CONTEXT_LIMIT: usize = 500;

/// Notification priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low.
    Low,
    /// Normal.
    #[default]
    Normal,
    /// High; the header gets a `!` marker.
    High,
}

/// First [`CONTEXT_LIMIT`] characters of `context`.
#[must_use]
pub fn truncate_context(context: &str) -> &str {
    match context.char_indices().nth(CONTEXT_LIMIT) {
        Some((idx, _)) => &context[..idx],
        None => context,
    }
}

/// Backslash-escape relay Markdown markers so `text` renders literally.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Body for a `notify` tool call.
#[must_use]
pub fn format_notification_message(agent_name: &str, message: &str, priority: Priority) -> String {
    let marker = match priority {
        Priority::High => "! ",
        Priority::Low | Priority::Normal => "",
    };
    format!("{marker}**Notification from {agent_name}**\n\n{message}")
}

/// Body for a `request_approval` tool call. Empty context is omitted.
#[must_use]
pub fn format_approval_message(title: &str, description: &str, context: Option<&str>) -> String {
    let mut text = format!("**Approval Request**\n\n**{title}**\n\n{description}");
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        let _ = write!(text, "\n\n```\n{}\n```", truncate_context(context));
    }
    text
}

/// Body for a `send_prompt` tool call, with options numbered from 1.
#[must_use]
pub fn format_prompt_message(agent_name: &str, question: &str, options: &[String]) -> String {
    let mut text = format!("**Question from {agent_name}**\n\n{question}");
    if !options.is_empty() {
        text.push_str("\n\n*Suggested options:*");
        for (n, option) in (1_usize..).zip(options) {
            let _ = write!(text, "\n{n}. {option}");
        }
    }
    text.push_str("\n\n_Reply to this message with your answer._");
    text
}

/// Reply to `/status`.
#[must_use]
pub fn format_status_message(pending: usize, connections: usize, mode: DeliveryMode) -> String {
    format!(
        "**Queue Status**\n\nPending messages: {pending}\nActive MCP connections: {connections}\nMode: {}",
        mode.label()
    )
}

/// One queued message as reported to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessageView {
    /// Queue message id.
    pub id: String,
    /// Message text.
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Command name for command-origin messages, otherwise `message`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whole seconds since `timestamp`.
    pub age_seconds: i64,
}

/// Payload of `get_pending_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessages {
    /// Number of messages.
    pub count: usize,
    /// Messages in queue order.
    pub messages: Vec<PendingMessageView>,
}

/// Describe a queue snapshot relative to `now` (epoch ms).
#[must_use]
pub fn format_pending_messages(messages: &[QueuedMessage], now: i64) -> PendingMessages {
    let messages: Vec<PendingMessageView> = messages
        .iter()
        .map(|m| PendingMessageView {
            id: m.id.clone(),
            text: m.text.clone(),
            timestamp: m.timestamp,
            kind: if m.is_command {
                m.command.clone().unwrap_or_else(|| "command".to_string())
            } else {
                "message".to_string()
            },
            age_seconds: now.saturating_sub(m.timestamp).div_euclid(1000),
        })
        .collect();

    PendingMessages {
        count: messages.len(),
        messages,
    }
}
