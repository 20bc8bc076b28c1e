//! Test fixtures for common types.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{
    CallbackOrigin, ChatId, InboundCallback, InboundText, Relay, RelaySettings,
};

use crate::mocks::MockTransport;

/// The chat every fixture talks to.
pub const TEST_CHAT: ChatId = ChatId(42);

/// A chat the relay must ignore.
pub const FOREIGN_CHAT: ChatId = ChatId(7);

/// Id given to inbound fixture messages.
pub const INBOUND_MESSAGE_ID: i32 = 1;

/// Settings for [`TEST_CHAT`] with short timeouts (5s approval, 10s prompt).
#[must_use]
pub fn test_settings() -> RelaySettings {
    RelaySettings::new(TEST_CHAT)
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
}

/// A relay over `mock` with [`test_settings`].
#[must_use]
pub fn test_relay(mock: &MockTransport) -> Arc<Relay> {
    test_relay_with(mock, test_settings())
}

/// A relay over `mock` with custom settings.
#[must_use]
pub fn test_relay_with(mock: &MockTransport, settings: RelaySettings) -> Arc<Relay> {
    Arc::new(Relay::new(Arc::new(mock.clone()), settings))
}

/// A text message from [`TEST_CHAT`].
#[must_use]
pub fn inbound_text(text: &str) -> InboundText {
    InboundText {
        chat: TEST_CHAT,
        message_id: INBOUND_MESSAGE_ID,
        text: Some(text.to_string()),
    }
}

/// A text message from [`FOREIGN_CHAT`].
#[must_use]
pub fn foreign_text(text: &str) -> InboundText {
    InboundText {
        chat: FOREIGN_CHAT,
        ..inbound_text(text)
    }
}

/// A button click on message `message_id` in [`TEST_CHAT`].
#[must_use]
pub fn inbound_callback(data: &str, message_id: i32, message_text: &str) -> InboundCallback {
    InboundCallback {
        id: format!("cb-{message_id}"),
        data: Some(data.to_string()),
        message: Some(CallbackOrigin {
            chat: TEST_CHAT,
            message_id,
            text: Some(message_text.to_string()),
        }),
    }
}
