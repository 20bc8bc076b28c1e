//! Inbound message queue.
//!
//! Messages typed by the user accumulate here until the agent drains them
//! with `get_pending_messages`. The queue is unbounded: volume is expected
//! to be low and the consumer responsive.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// A user message waiting for the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    /// `msg_<timestamp>`. Two messages in the same millisecond share an id.
    pub id: String,
    /// Message body (command content for command-origin messages).
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Whether the message came from a chat command.
    pub is_command: bool,
    /// Canonical command name (`quest`, `chat`) for command-origin messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl QueuedMessage {
    /// A free-text message.
    pub fn plain(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: message_id(timestamp),
            text: text.into(),
            timestamp,
            is_command: false,
            command: None,
        }
    }

    /// A message produced by a chat command.
    pub fn command(command: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: message_id(timestamp),
            text: text.into(),
            timestamp,
            is_command: true,
            command: Some(command.into()),
        }
    }

    /// First `max_chars` characters of the text, for log lines.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// Queue message id for a timestamp.
#[must_use]
pub fn message_id(timestamp: i64) -> String {
    format!("msg_{timestamp}")
}

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Insertion-ordered buffer of [`QueuedMessage`]s.
///
/// Reads return snapshots; only [`push`](Self::push), [`clear`](Self::clear)
/// and [`drain`](Self::drain) mutate.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<Vec<QueuedMessage>>,
}

impl MessageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message.
    pub fn push(&self, message: QueuedMessage) {
        self.lock().push(message);
    }

    /// Remove every message.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of the queue in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<QueuedMessage> {
        self.lock().clone()
    }

    /// Take every message, leaving the queue empty, in one step.
    #[must_use]
    pub fn drain(&self) -> Vec<QueuedMessage> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
