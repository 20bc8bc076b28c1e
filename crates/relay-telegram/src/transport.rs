//! [`ChatTransport`] over the Telegram Bot API.

use async_trait::async_trait;
use relay_core::{
    Button, ChatId, ChatTransport, Markup, OutgoingMessage, RelayError, RelayResult, SentMessage,
};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
    ReplyParameters,
};
use tracing::debug;

use crate::format::{MAX_MESSAGE_CHARS, fit_message, markdown_to_html, split_message};

/// Sends relay messages through a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// The underlying bot.
    #[must_use]
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport").finish_non_exhaustive()
    }
}

fn tg_chat(chat: ChatId) -> TgChatId {
    TgChatId(chat.0)
}

fn render(text: &str, markup: Markup) -> String {
    match markup {
        Markup::Plain => text.to_string(),
        Markup::Markdown => markdown_to_html(text),
    }
}

pub(crate) fn keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> RelayResult<SentMessage> {
        // Split before rendering: the limit counts visible characters, and
        // rendering never adds any.
        let pieces = split_message(&message.text, MAX_MESSAGE_CHARS);
        let last = pieces.len().saturating_sub(1);
        if last > 0 {
            debug!(chat_id = %chat, pieces = pieces.len(), "Splitting long message");
        }

        let mut delivered = None;
        for (i, piece) in pieces.iter().enumerate() {
            let mut request = self
                .bot
                .send_message(tg_chat(chat), render(piece, message.markup));
            if message.markup == Markup::Markdown {
                request = request.parse_mode(ParseMode::Html);
            }
            if i == 0
                && let Some(reply_to) = message.reply_to
            {
                request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
            }
            if i == last && !message.buttons.is_empty() {
                request = request.reply_markup(keyboard(&message.buttons));
            }
            let sent = request.await.map_err(RelayError::transport)?;
            delivered = Some(sent.id.0);
        }

        delivered
            .map(|message_id| SentMessage { message_id })
            .ok_or_else(|| RelayError::transport("nothing to send"))
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message_id: i32,
        text: String,
        markup: Markup,
    ) -> RelayResult<()> {
        // Edits cannot split, so shorten the body and keep the status line.
        let text = fit_message(&text, MAX_MESSAGE_CHARS);
        let mut request =
            self.bot
                .edit_message_text(tg_chat(chat), MessageId(message_id), render(&text, markup));
        if markup == Markup::Markdown {
            request = request.parse_mode(ParseMode::Html);
        }
        request.await.map_err(RelayError::transport)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<String>) -> RelayResult<()> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map_err(RelayError::transport)?;
        Ok(())
    }

    async fn clear_buttons(&self, chat: ChatId, message_id: i32) -> RelayResult<()> {
        self.bot
            .edit_message_reply_markup(tg_chat(chat), MessageId(message_id))
            .reply_markup(InlineKeyboardMarkup::new(
                Vec::<Vec<InlineKeyboardButton>>::new(),
            ))
            .await
            .map_err(RelayError::transport)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    #[test]
    fn keyboard_keeps_rows_and_payloads() {
        let markup = keyboard(&[vec![
            Button::callback("Approve", "approve:req_1"),
            Button::callback("Deny", "deny:req_1"),
        ]]);

        assert_eq!(markup.inline_keyboard.len(), 1);
        let row = &markup.inline_keyboard[0];
        assert_eq!(row[0].text, "Approve");
        assert_eq!(
            row[1].kind,
            InlineKeyboardButtonKind::CallbackData("deny:req_1".to_string())
        );
    }

    #[test]
    fn plain_text_is_not_rendered() {
        assert_eq!(render("**x** <y>", Markup::Plain), "**x** <y>");
        assert_eq!(render("**x** <y>", Markup::Markdown), "<b>x</b> &lt;y&gt;");
    }
}
