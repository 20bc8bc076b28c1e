//! The relay context: one owned value holding the queue, the pending table
//! and the chat transport, passed to every handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::{CommandRouter, CommandType, DEFAULT_AGENT_NAME, parse_command};
use crate::error::RelayResult;
use crate::format::{
    Priority, escape_markdown, format_approval_message, format_notification_message,
    format_pending_messages, format_prompt_message, format_status_message,
};
use crate::pending::{Completion, PendingTable, Reply, RequestKind};
use crate::queue::{MessageQueue, QueuedMessage, now_millis};
use crate::result::ToolResult;
use crate::transport::{
    Button, ChatId, ChatTransport, InboundCallback, InboundText, Markup, OutgoingMessage,
};

/// Characters of message text shown in queue log lines.
const LOG_PREVIEW_CHARS: usize = 50;

/// How chat updates reach the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Long polling.
    #[default]
    Polling,
    /// Telegram pushes to `/webhook`.
    Webhook,
}

impl DeliveryMode {
    /// `Polling` or `Webhook`, for chat messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Polling => "Polling",
            Self::Webhook => "Webhook",
        }
    }

    /// `polling` or `webhook`, for JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook => "webhook",
        }
    }
}

/// Runtime settings of a [`Relay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// The one chat the relay talks to.
    pub chat: ChatId,
    /// Name of the agent in headers and confirmations.
    pub agent_name: String,
    /// How long an approval waits.
    pub approval_timeout: Duration,
    /// How long a prompt waits.
    pub prompt_timeout: Duration,
    /// Update delivery mode.
    pub delivery: DeliveryMode,
    /// Whether `/status` is available (HTTP mode).
    pub status_command: bool,
}

impl RelaySettings {
    /// Defaults: agent `Qoder`, 5 minute approvals, 10 minute prompts,
    /// polling, no `/status`.
    #[must_use]
    pub fn new(chat: ChatId) -> Self {
        Self {
            chat,
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            approval_timeout: Duration::from_secs(5 * 60),
            prompt_timeout: Duration::from_secs(10 * 60),
            delivery: DeliveryMode::Polling,
            status_command: false,
        }
    }

    /// Set the agent name.
    #[must_use]
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    /// Set both interactive timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, approval: Duration, prompt: Duration) -> Self {
        self.approval_timeout = approval;
        self.prompt_timeout = prompt;
        self
    }

    /// Set the delivery mode.
    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    /// Enable or disable `/status`.
    #[must_use]
    pub fn with_status_command(mut self, enabled: bool) -> Self {
        self.status_command = enabled;
        self
    }
}

/// What happened to an inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Wrong chat, no text, or an unknown command.
    Ignored,
    /// Pushed to the queue.
    Queued {
        /// Queue message id.
        id: String,
    },
    /// Answered a pending prompt.
    Answered {
        /// The prompt's request id.
        request_id: String,
    },
    /// Answered directly (`/help`, `/status`).
    Replied,
}

/// What happened to a button click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Resolved a pending approval.
    Resolved {
        /// The approval's request id.
        request_id: String,
        /// The decision.
        reply: Reply,
    },
    /// No pending approval with that id, or no id at all. The click is
    /// still answered.
    Expired,
    /// No payload, or not from the relay chat.
    Ignored,
}

/// Counts a live MCP connection until dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared relay state and operations.
pub struct Relay {
    transport: Arc<dyn ChatTransport>,
    settings: RelaySettings,
    router: CommandRouter,
    queue: MessageQueue,
    pending: PendingTable,
    connections: Arc<AtomicUsize>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("settings", &self.settings)
            .field("queue_len", &self.queue.len())
            .field("pending", &self.pending.len())
            .field("connections", &self.active_connections())
            .finish_non_exhaustive()
    }
}

impl Relay {
    /// Create a relay over `transport`.
    pub fn new(transport: Arc<dyn ChatTransport>, settings: RelaySettings) -> Self {
        let router = CommandRouter::new(settings.agent_name.clone(), settings.status_command);
        Self {
            transport,
            settings,
            router,
            queue: MessageQueue::new(),
            pending: PendingTable::new(),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// The inbound queue.
    #[must_use]
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// The pending-request table.
    #[must_use]
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Number of live MCP connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Count an MCP connection for as long as the guard lives.
    #[must_use]
    pub fn track_connection(&self) -> ConnectionGuard {
        self.connections.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            counter: Arc::clone(&self.connections),
        }
    }

    /// `/status` reply text.
    #[must_use]
    pub fn status_text(&self) -> String {
        format_status_message(
            self.queue.len(),
            self.active_connections(),
            self.settings.delivery,
        )
    }

    /// Send the startup announcement.
    pub async fn announce_online(&self) -> RelayResult<()> {
        let text = format!(
            "MCP Server online!\nMode: {}",
            self.settings.delivery.label()
        );
        self.transport
            .send(self.settings.chat, OutgoingMessage::plain(text))
            .await?;
        Ok(())
    }

    fn enqueue(&self, message: QueuedMessage) -> String {
        let id = message.id.clone();
        info!(
            id = %id,
            preview = %message.preview(LOG_PREVIEW_CHARS),
            active_connections = self.active_connections(),
            "New message queued"
        );
        self.queue.push(message);
        id
    }

    async fn reply(&self, message: OutgoingMessage) {
        if let Err(e) = self.transport.send(self.settings.chat, message).await {
            warn!(chat_id = %self.settings.chat, "Failed to send reply: {e}");
        }
    }

    /// Handle a text message from the chat.
    ///
    /// Commands are routed; other text answers the oldest pending prompt
    /// or, if none is waiting, is queued for the agent.
    pub async fn handle_text(&self, inbound: InboundText) -> InboundOutcome {
        if inbound.chat != self.settings.chat {
            debug!(chat_id = %inbound.chat, "Ignoring message from foreign chat");
            return InboundOutcome::Ignored;
        }
        let Some(text) = inbound.text else {
            return InboundOutcome::Ignored;
        };

        let parsed = parse_command(&text);
        let now = now_millis();

        if let Some(command) = parsed.command.as_deref() {
            let result = self.router.route(command, &parsed.content, now);
            return match result.command_type {
                CommandType::Quest | CommandType::Chat => {
                    let Some(message) = result.queued_message.filter(|_| result.should_queue)
                    else {
                        return InboundOutcome::Ignored;
                    };
                    let id = self.enqueue(message);
                    if let Some(confirmation) = result.response_text {
                        self.reply(OutgoingMessage::plain(confirmation).reply_to(inbound.message_id))
                            .await;
                    }
                    InboundOutcome::Queued { id }
                },
                CommandType::Help => {
                    if let Some(help) = result.response_text {
                        self.reply(OutgoingMessage::markdown(help)).await;
                    }
                    InboundOutcome::Replied
                },
                CommandType::Status => {
                    self.reply(OutgoingMessage::markdown(self.status_text()))
                        .await;
                    InboundOutcome::Replied
                },
                CommandType::Unknown => {
                    debug!(command, "Ignoring unknown command");
                    InboundOutcome::Ignored
                },
            };
        }

        let content = parsed.content;
        if let Some(request_id) = self
            .pending
            .resolve_first(RequestKind::Prompt, Reply::Text(content.clone()))
        {
            info!(request_id = %request_id, "Prompt answered");
            self.reply(
                OutgoingMessage::plain("Received your response.").reply_to(inbound.message_id),
            )
            .await;
            return InboundOutcome::Answered { request_id };
        }

        let id = self.enqueue(QueuedMessage::plain(content, now));
        self.reply(
            OutgoingMessage::plain(format!(
                "Message queued. {} will pick it up.",
                self.settings.agent_name
            ))
            .reply_to(inbound.message_id),
        )
        .await;
        InboundOutcome::Queued { id }
    }

    /// Handle a button click.
    ///
    /// Payloads are `<action>:<request_id>`; `approve` approves and any
    /// other action denies. Only approval entries are resolved here.
    pub async fn handle_callback(&self, callback: InboundCallback) -> CallbackOutcome {
        let (Some(data), Some(origin)) = (callback.data.as_deref(), callback.message.as_ref())
        else {
            return CallbackOutcome::Ignored;
        };
        if origin.chat != self.settings.chat {
            debug!(chat_id = %origin.chat, "Ignoring callback from foreign chat");
            return CallbackOutcome::Ignored;
        }

        let mut parts = data.split(':');
        let (Some(action), Some(request_id)) = (parts.next(), parts.next()) else {
            debug!(data, "Callback without a request id");
            self.expire_callback(&callback.id).await;
            return CallbackOutcome::Expired;
        };

        let reply = Reply::from_action(action);
        if !self
            .pending
            .resolve_kind(request_id, RequestKind::Approval, reply.clone())
        {
            self.expire_callback(&callback.id).await;
            return CallbackOutcome::Expired;
        }

        let label = reply.label().to_string();
        info!(request_id, decision = %label, "Approval resolved");

        // Telegram hands back the rendered text without markup.
        let edited = format!(
            "{}\n\n**Response: {label}**",
            escape_markdown(origin.text.as_deref().unwrap_or_default())
        );
        if let Err(e) = self
            .transport
            .edit_text(origin.chat, origin.message_id, edited, Markup::Markdown)
            .await
        {
            warn!(request_id, "Failed to edit approval message: {e}");
        }
        if let Err(e) = self
            .transport
            .answer_callback(&callback.id, Some(label))
            .await
        {
            warn!(request_id, "Failed to answer callback: {e}");
        }

        CallbackOutcome::Resolved {
            request_id: request_id.to_string(),
            reply,
        }
    }

    async fn expire_callback(&self, callback_id: &str) {
        if let Err(e) = self
            .transport
            .answer_callback(callback_id, Some("Request expired".to_string()))
            .await
        {
            warn!(callback_id, "Failed to answer callback: {e}");
        }
    }

    /// Ask for approval with Approve/Deny buttons and wait for the click.
    pub async fn request_approval(
        &self,
        title: &str,
        description: &str,
        context: Option<&str>,
    ) -> ToolResult {
        let text = format_approval_message(title, description, context);
        let request = self
            .pending
            .register(RequestKind::Approval, self.settings.approval_timeout);
        let id = request.id().to_string();
        let buttons = vec![vec![
            Button::callback("Approve", format!("approve:{id}")),
            Button::callback("Deny", format!("deny:{id}")),
        ]];

        let sent = match self
            .transport
            .send(
                self.settings.chat,
                OutgoingMessage::markdown(text).with_buttons(buttons),
            )
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!(request_id = %id, "Failed to send approval request: {e}");
                return ToolResult::error(e.to_string());
            },
        };
        self.pending.attach_message(&id, sent.message_id);
        info!(request_id = %id, "Approval requested");

        match request.wait().await {
            Completion::Replied(Reply::Approved) => ToolResult::decision(true),
            Completion::Replied(_) => ToolResult::decision(false),
            Completion::TimedOut { message_id } => {
                info!(request_id = %id, "Approval request timed out");
                if let Some(message_id) = message_id
                    && let Err(e) = self
                        .transport
                        .clear_buttons(self.settings.chat, message_id)
                        .await
                {
                    warn!(request_id = %id, "Failed to clear approval buttons: {e}");
                }
                ToolResult::approval_timeout()
            },
            Completion::Discarded => ToolResult::error("Approval request was discarded"),
        }
    }

    /// Ask a question and wait for the next free-text reply.
    pub async fn send_prompt(&self, question: &str, options: &[String]) -> ToolResult {
        let text = format_prompt_message(&self.settings.agent_name, question, options);
        let request = self
            .pending
            .register(RequestKind::Prompt, self.settings.prompt_timeout);
        let id = request.id().to_string();

        let sent = match self
            .transport
            .send(self.settings.chat, OutgoingMessage::markdown(text))
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!(request_id = %id, "Failed to send prompt: {e}");
                return ToolResult::error(e.to_string());
            },
        };
        self.pending.attach_message(&id, sent.message_id);
        info!(request_id = %id, "Prompt sent");

        match request.wait().await {
            Completion::Replied(reply) => ToolResult::response(reply.label()),
            Completion::TimedOut { .. } => {
                info!(request_id = %id, "Prompt timed out");
                ToolResult::prompt_timeout()
            },
            Completion::Discarded => ToolResult::error("Prompt was discarded"),
        }
    }

    /// Send a notification.
    pub async fn notify(&self, message: &str, priority: Priority) -> ToolResult {
        let text = format_notification_message(&self.settings.agent_name, message, priority);
        self.send_markdown(text).await
    }

    /// Send a message as-is (Markdown).
    pub async fn send_message(&self, message: &str) -> ToolResult {
        self.send_markdown(message.to_string()).await
    }

    async fn send_markdown(&self, text: String) -> ToolResult {
        match self
            .transport
            .send(self.settings.chat, OutgoingMessage::markdown(text))
            .await
        {
            Ok(_) => ToolResult::success(),
            Err(e) => {
                warn!("Failed to send message: {e}");
                ToolResult::error(e.to_string())
            },
        }
    }

    /// Report queued messages, draining the queue unless `peek`.
    #[must_use]
    pub fn get_pending_messages(&self, peek: bool) -> ToolResult {
        let messages = if peek {
            self.queue.get_all()
        } else {
            self.queue.drain()
        };
        debug!(count = messages.len(), peek, "Pending messages read");
        ToolResult::from(format_pending_messages(&messages, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_mode_labels() {
        assert_eq!(DeliveryMode::Polling.label(), "Polling");
        assert_eq!(DeliveryMode::Webhook.label(), "Webhook");
        assert_eq!(DeliveryMode::Webhook.as_str(), "webhook");
        assert_eq!(
            serde_json::to_value(DeliveryMode::Polling).unwrap(),
            serde_json::json!("polling")
        );
    }

    #[test]
    fn settings_defaults() {
        let settings = RelaySettings::new(ChatId(1));
        assert_eq!(settings.agent_name, "Qoder");
        assert_eq!(settings.approval_timeout, Duration::from_secs(300));
        assert_eq!(settings.prompt_timeout, Duration::from_secs(600));
        assert_eq!(settings.delivery, DeliveryMode::Polling);
        assert!(!settings.status_command);
    }

    #[test]
    fn settings_builders() {
        let settings = RelaySettings::new(ChatId(1))
            .with_agent_name("Astra")
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2))
            .with_delivery(DeliveryMode::Webhook)
            .with_status_command(true);
        assert_eq!(settings.agent_name, "Astra");
        assert_eq!(settings.prompt_timeout, Duration::from_secs(2));
        assert_eq!(settings.delivery, DeliveryMode::Webhook);
        assert!(settings.status_command);
    }
}
