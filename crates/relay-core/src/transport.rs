//! The chat-side seam.
//!
//! [`ChatTransport`] is what the relay needs from a chat service; the
//! inbound types are what it consumes. Both are transport-neutral so the
//! relay can be driven by Telegram in production and by a mock in tests.

use async_trait::async_trait;

use crate::error::RelayResult;

/// Chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a message body should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Markup {
    /// Literal text.
    #[default]
    Plain,
    /// Light Markdown, rendered by the transport.
    Markdown,
}

/// An inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Visible label.
    pub label: String,
    /// Callback payload returned on click.
    pub data: String,
}

impl Button {
    /// Create a callback button.
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    /// Body.
    pub text: String,
    /// Body interpretation.
    pub markup: Markup,
    /// Message this one replies to.
    pub reply_to: Option<i32>,
    /// Inline keyboard rows.
    pub buttons: Vec<Vec<Button>>,
}

impl OutgoingMessage {
    /// Plain-text message.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Markdown message.
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::Markdown,
            ..Self::default()
        }
    }

    /// Link as a reply to `message_id`.
    #[must_use]
    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    /// Attach inline keyboard rows.
    #[must_use]
    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.buttons = rows;
        self
    }
}

/// Receipt for a sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    /// Id of the (last) delivered message.
    pub message_id: i32,
}

/// Outbound chat operations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message.
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> RelayResult<SentMessage>;

    /// Replace the text of a sent message.
    async fn edit_text(
        &self,
        chat: ChatId,
        message_id: i32,
        text: String,
        markup: Markup,
    ) -> RelayResult<()>;

    /// Acknowledge a button click, optionally with a toast text.
    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> RelayResult<()>;

    /// Remove the inline keyboard of a sent message.
    async fn clear_buttons(&self, chat: ChatId, message_id: i32) -> RelayResult<()>;
}

/// A text message from the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    /// Originating chat.
    pub chat: ChatId,
    /// Id of the user's message.
    pub message_id: i32,
    /// Text, if the message had any.
    pub text: Option<String>,
}

/// The message a clicked button belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOrigin {
    /// Chat of the message.
    pub chat: ChatId,
    /// Id of the message.
    pub message_id: i32,
    /// Current text of the message.
    pub text: Option<String>,
}

/// A button click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCallback {
    /// Callback query id, used to acknowledge.
    pub id: String,
    /// Button payload.
    pub data: Option<String>,
    /// Message carrying the button, if still accessible.
    pub message: Option<CallbackOrigin>,
}
