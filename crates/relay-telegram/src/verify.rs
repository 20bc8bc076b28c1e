//! Connectivity self-check behind `telegram-relay verify`.

use relay_core::{
    ChatId, CommandType, MessageQueue, QueuedMessage, handle_command, now_millis, parse_command,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup};

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Short check name.
    pub name: &'static str,
    /// Whether it passed.
    pub passed: bool,
    /// What was observed, or why it failed.
    pub detail: String,
}

impl CheckOutcome {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Run every check against the live Bot API, then the local self-check.
///
/// Network checks stop at the first failure since later ones depend on it.
pub async fn verify(bot: &Bot, chat: ChatId) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::new();
    let target = TgChatId(chat.0);

    match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.as_deref().unwrap_or("unknown");
            outcomes.push(CheckOutcome::pass(
                "bot connection",
                format!("connected as @{username}"),
            ));
            outcomes.extend(message_checks(bot, target).await);
        },
        Err(e) => outcomes.push(CheckOutcome::fail("bot connection", e.to_string())),
    }

    outcomes.push(queue_self_check());
    outcomes
}

async fn message_checks(bot: &Bot, target: TgChatId) -> Vec<CheckOutcome> {
    let sent = bot
        .send_message(target, "Verification test - bidirectional communication ready!")
        .await;
    let first = match sent {
        Ok(msg) => CheckOutcome::pass("message sending", format!("message id {}", msg.id.0)),
        Err(e) => return vec![CheckOutcome::fail("message sending", e.to_string())],
    };

    let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::callback("Test", "test:123")]]);
    let second = match bot
        .send_message(target, "Keyboard test")
        .reply_markup(keyboard)
        .await
    {
        Ok(msg) => match bot.delete_message(target, msg.id).await {
            Ok(_) => CheckOutcome::pass("inline keyboard", "sent and deleted"),
            Err(e) => CheckOutcome::fail("inline keyboard", format!("delete failed: {e}")),
        },
        Err(e) => CheckOutcome::fail("inline keyboard", e.to_string()),
    };

    vec![first, second]
}

/// Exercise the command parser and queue without touching the network.
#[must_use]
pub fn queue_self_check() -> CheckOutcome {
    const NAME: &str = "message queue";
    let now = now_millis();
    let queue = MessageQueue::new();
    queue.push(QueuedMessage::plain("test", now));

    let parsed = parse_command("/quest task");
    let Some(command) = parsed.command.as_deref() else {
        return CheckOutcome::fail(NAME, "'/quest task' was not parsed as a command");
    };
    let routed = handle_command(command, &parsed.content, now);
    if routed.command_type != CommandType::Quest {
        return CheckOutcome::fail(NAME, "'/quest' was not routed as a quest");
    }
    if let Some(message) = routed.queued_message {
        queue.push(message);
    }

    let messages = queue.drain();
    let ok = messages.len() == 2
        && messages[1].command.as_deref() == Some("quest")
        && messages[1].text == "task"
        && queue.is_empty();
    if ok {
        CheckOutcome::pass(NAME, "queue and command routing work")
    } else {
        CheckOutcome::fail(NAME, format!("unexpected queue contents: {messages:?}"))
    }
}
