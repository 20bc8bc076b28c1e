//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    ChatId, ChatTransport, Markup, OutgoingMessage, RelayError, RelayResult, SentMessage,
};

/// First message id handed out by [`MockTransport`].
pub const FIRST_MESSAGE_ID: i32 = 100;

/// A message recorded by [`MockTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    /// Target chat.
    pub chat: ChatId,
    /// The message as passed to the transport.
    pub message: OutgoingMessage,
    /// Id assigned by the mock.
    pub message_id: i32,
}

/// A recorded [`MockTransport::edit_text`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    /// Chat of the edited message.
    pub chat: ChatId,
    /// Edited message id.
    pub message_id: i32,
    /// New text.
    pub text: String,
    /// Markup of the new text.
    pub markup: Markup,
}

/// Recording implementation of [`ChatTransport`].
///
/// Every call is captured; sends can be switched to fail. Uses
/// `std::sync::Mutex` so inspection works outside a runtime.
#[derive(Debug, Clone)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<SentRecord>>>,
    edits: Arc<Mutex<Vec<EditRecord>>>,
    answers: Arc<Mutex<Vec<(String, Option<String>)>>>,
    cleared: Arc<Mutex<Vec<(ChatId, i32)>>>,
    fail_sends: Arc<AtomicBool>,
    next_id: Arc<AtomicI32>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            answers: Arc::new(Mutex::new(Vec::new())),
            cleared: Arc::new(Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicI32::new(FIRST_MESSAGE_ID)),
        }
    }

    /// Make every send fail.
    #[must_use]
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.set_fail_sends(true);
        mock
    }

    /// Switch send failures on or off.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// All sent messages.
    #[must_use]
    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Texts of all sent messages.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|record| record.message.text)
            .collect()
    }

    /// The most recently sent message.
    #[must_use]
    pub fn last_sent(&self) -> Option<SentRecord> {
        self.sent().pop()
    }

    /// Callback payloads of the most recent message that carried buttons.
    #[must_use]
    pub fn last_button_data(&self) -> Option<Vec<String>> {
        self.sent()
            .into_iter()
            .rev()
            .find(|record| !record.message.buttons.is_empty())
            .map(|record| {
                record
                    .message
                    .buttons
                    .iter()
                    .flatten()
                    .map(|button| button.data.clone())
                    .collect()
            })
    }

    /// All text edits.
    #[must_use]
    pub fn edits(&self) -> Vec<EditRecord> {
        self.edits.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// All callback acknowledgements as `(callback_id, text)`.
    #[must_use]
    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.answers.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// All keyboard removals as `(chat, message_id)`.
    #[must_use]
    pub fn cleared(&self) -> Vec<(ChatId, i32)> {
        self.cleared.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Wait until at least `count` messages were sent, polling every few
    /// milliseconds for at most `timeout`. Returns what was sent.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> Vec<SentRecord> {
        let deadline = tokio::time::Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(tokio::time::Instant::now);
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> RelayResult<SentMessage> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::transport("Bad Request: chat not found"));
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(SentRecord {
                chat,
                message,
                message_id,
            });
        }
        Ok(SentMessage { message_id })
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message_id: i32,
        text: String,
        markup: Markup,
    ) -> RelayResult<()> {
        if let Ok(mut guard) = self.edits.lock() {
            guard.push(EditRecord {
                chat,
                message_id,
                text,
                markup,
            });
        }
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> RelayResult<()> {
        if let Ok(mut guard) = self.answers.lock() {
            guard.push((callback_id.to_string(), text));
        }
        Ok(())
    }

    async fn clear_buttons(&self, chat: ChatId, message_id: i32) -> RelayResult<()> {
        if let Ok(mut guard) = self.cleared.lock() {
            guard.push((chat, message_id));
        }
        Ok(())
    }
}
