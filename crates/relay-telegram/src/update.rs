//! Conversion of Telegram updates into relay events.

use relay_core::{CallbackOrigin, ChatId, InboundCallback, InboundText, Relay};
use teloxide::types::{CallbackQuery, MaybeInaccessibleMessage, Message, Update, UpdateKind};
use tracing::debug;

use crate::error::TelegramResult;

/// A chat message as a relay event.
#[must_use]
pub fn inbound_text(msg: &Message) -> InboundText {
    InboundText {
        chat: ChatId(msg.chat.id.0),
        message_id: msg.id.0,
        text: msg.text().map(str::to_string),
    }
}

/// A button click as a relay event.
#[must_use]
pub fn inbound_callback(query: &CallbackQuery) -> InboundCallback {
    let message = query.message.as_ref().map(|m| CallbackOrigin {
        chat: ChatId(m.chat().id.0),
        message_id: m.id().0,
        text: match m {
            MaybeInaccessibleMessage::Regular(msg) => msg.text().map(str::to_string),
            MaybeInaccessibleMessage::Inaccessible(_) => None,
        },
    });
    InboundCallback {
        id: query.id.clone(),
        data: query.data.clone(),
        message,
    }
}

/// Parse a webhook body.
///
/// # Errors
///
/// Returns [`TelegramError::InvalidUpdate`](crate::TelegramError::InvalidUpdate)
/// if the body is not an update object.
pub fn parse_update(body: &[u8]) -> TelegramResult<Update> {
    Ok(serde_json::from_slice(body)?)
}

/// Feed one update to the relay. Kinds other than messages and button
/// clicks are ignored.
pub async fn dispatch_update(relay: &Relay, update: Update) {
    let update_id = update.id;
    match update.kind {
        UpdateKind::Message(msg) => {
            let outcome = relay.handle_text(inbound_text(&msg)).await;
            debug!(?update_id, ?outcome, "Message handled");
        },
        UpdateKind::CallbackQuery(query) => {
            let outcome = relay.handle_callback(inbound_callback(&query)).await;
            debug!(?update_id, ?outcome, "Callback handled");
        },
        _ => {
            debug!(?update_id, "Ignoring update kind");
        },
    }
}
