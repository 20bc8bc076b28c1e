//! Chat command parsing and routing.
//!
//! Parsing and routing are pure: the router describes what should happen
//! (queue a message, answer with help text, ignore) and the caller performs
//! it.

use crate::queue::QueuedMessage;

/// Leading character that marks a chat command.
pub const COMMAND_MARKER: char = '/';

/// Queued text for a `/quest` with no task.
pub const DEFAULT_QUEST_TEXT: &str = "New Quest requested";

/// Agent name used by [`CommandRouter::default`].
pub const DEFAULT_AGENT_NAME: &str = "Qoder";

/// Raw chat text split into command and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Whether the text started with [`COMMAND_MARKER`].
    pub is_command: bool,
    /// Lower-cased command token with any `@handle` suffix removed.
    pub command: Option<String>,
    /// Remaining tokens joined by single spaces, or the whole trimmed text.
    pub content: String,
}

/// Parse raw chat text.
///
/// `"/Quest@MyBot  build   x"` parses to command `/quest`, content `build x`.
#[must_use]
pub fn parse_command(text: &str) -> ParsedCommand {
    let trimmed = text.trim();
    if !trimmed.starts_with(COMMAND_MARKER) {
        return ParsedCommand {
            is_command: false,
            command: None,
            content: trimmed.to_string(),
        };
    }

    let mut tokens = trimmed.split_whitespace();
    let head = tokens.next().unwrap_or_default().to_lowercase();
    let command = head
        .split_once('@')
        .map_or(head.as_str(), |(bare, _)| bare)
        .to_string();
    let content = tokens.collect::<Vec<_>>().join(" ");

    ParsedCommand {
        is_command: true,
        command: Some(command),
        content,
    }
}

/// What a command token means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// `/quest`, `/q`
    Quest,
    /// `/chat`, `/c`
    Chat,
    /// `/help`
    Help,
    /// `/status`
    Status,
    /// Anything else.
    Unknown,
}

impl CommandType {
    /// Canonical lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quest => "quest",
            Self::Chat => "chat",
            Self::Help => "help",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a (lower-cased) command token.
#[must_use]
pub fn get_command_type(command: &str) -> CommandType {
    match command {
        "/quest" | "/q" => CommandType::Quest,
        "/chat" | "/c" => CommandType::Chat,
        "/help" => CommandType::Help,
        "/status" => CommandType::Status,
        _ => CommandType::Unknown,
    }
}

/// Outcome of routing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Effective command type.
    pub command_type: CommandType,
    /// Whether [`queued_message`](Self::queued_message) should be pushed.
    pub should_queue: bool,
    /// Message to queue, present iff `should_queue`.
    pub queued_message: Option<QueuedMessage>,
    /// Text to send back to the chat.
    pub response_text: Option<String>,
}

impl CommandResult {
    fn silent(command_type: CommandType) -> Self {
        Self {
            command_type,
            should_queue: false,
            queued_message: None,
            response_text: None,
        }
    }
}

/// Maps parsed commands to actions.
///
/// `/status` is only recognized when `status_enabled` is set (HTTP mode);
/// otherwise it routes as [`CommandType::Unknown`]. The status reply needs
/// live counters, so the router only classifies it and leaves the text to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRouter {
    agent_name: String,
    status_enabled: bool,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_NAME, false)
    }
}

impl CommandRouter {
    /// Create a router for the named agent.
    pub fn new(agent_name: impl Into<String>, status_enabled: bool) -> Self {
        Self {
            agent_name: agent_name.into(),
            status_enabled,
        }
    }

    /// Agent name used in confirmations.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Whether `/status` is recognized.
    #[must_use]
    pub fn status_enabled(&self) -> bool {
        self.status_enabled
    }

    /// Route `command` with its `content`, stamping queued messages with
    /// `timestamp`.
    #[must_use]
    pub fn route(&self, command: &str, content: &str, timestamp: i64) -> CommandResult {
        match get_command_type(command) {
            CommandType::Quest => {
                let text = if content.is_empty() {
                    DEFAULT_QUEST_TEXT
                } else {
                    content
                };
                CommandResult {
                    command_type: CommandType::Quest,
                    should_queue: true,
                    queued_message: Some(QueuedMessage::command(
                        CommandType::Quest.as_str(),
                        text,
                        timestamp,
                    )),
                    response_text: Some(format!(
                        "Quest request queued. {} will pick it up when ready.",
                        self.agent_name
                    )),
                }
            },
            CommandType::Chat => CommandResult {
                command_type: CommandType::Chat,
                should_queue: true,
                queued_message: Some(QueuedMessage::command(
                    CommandType::Chat.as_str(),
                    content,
                    timestamp,
                )),
                response_text: Some(format!("Message queued for {}.", self.agent_name)),
            },
            CommandType::Help => CommandResult {
                command_type: CommandType::Help,
                should_queue: false,
                queued_message: None,
                response_text: Some(help_text(&self.agent_name, self.status_enabled)),
            },
            CommandType::Status if self.status_enabled => CommandResult::silent(CommandType::Status),
            CommandType::Status | CommandType::Unknown => CommandResult::silent(CommandType::Unknown),
        }
    }
}

/// Route with the default router (agent `Qoder`, no `/status`).
#[must_use]
pub fn handle_command(command: &str, content: &str, timestamp: i64) -> CommandResult {
    CommandRouter::default().route(command, content, timestamp)
}

/// Usage text listing the recognized commands.
#[must_use]
pub fn help_text(agent_name: &str, status_enabled: bool) -> String {
    let status_line = if status_enabled {
        "/status - Check queue status\n"
    } else {
        ""
    };
    format!(
        "**Available Commands**\n\n\
         /quest <task> or /q <task> - Create a new Quest\n\
         /chat <message> or /c <message> - Send message to {agent_name}\n\
         {status_line}\
         /help - Show this help\n\n\
         You can also just type a message and it will be queued for {agent_name}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        let parsed = parse_command("  hello there  ");
        assert!(!parsed.is_command);
        assert!(parsed.command.is_none());
        assert_eq!(parsed.content, "hello there");
    }

    #[test]
    fn non_command_content_is_trimmed_input() {
        for input in ["", "   ", "x", " a / b ", "hi /quest"] {
            let parsed = parse_command(input);
            assert!(!parsed.is_command, "{input:?}");
            assert_eq!(parsed.content, input.trim());
        }
    }

    #[test]
    fn command_with_handle_suffix() {
        let parsed = parse_command("/quest@MyBot build x");
        assert_eq!(
            parsed,
            ParsedCommand {
                is_command: true,
                command: Some("/quest".to_string()),
                content: "build x".to_string(),
            }
        );
    }

    #[test]
    fn command_is_lower_cased() {
        let parsed = parse_command("/HELP@Some_Bot");
        assert_eq!(parsed.command.as_deref(), Some("/help"));
        assert_eq!(parsed.content, "");
    }

    #[test]
    fn content_splits_on_any_whitespace() {
        let parsed = parse_command("/c  hello\tworld\n again");
        assert_eq!(parsed.command.as_deref(), Some("/c"));
        assert_eq!(parsed.content, "hello world again");
    }

    #[test]
    fn command_type_alias_table() {
        assert_eq!(get_command_type("/quest"), CommandType::Quest);
        assert_eq!(get_command_type("/q"), CommandType::Quest);
        assert_eq!(get_command_type("/chat"), CommandType::Chat);
        assert_eq!(get_command_type("/c"), CommandType::Chat);
        assert_eq!(get_command_type("/help"), CommandType::Help);
        assert_eq!(get_command_type("/status"), CommandType::Status);
        assert_eq!(get_command_type("/start"), CommandType::Unknown);
        assert_eq!(get_command_type("quest"), CommandType::Unknown);
        assert_eq!(get_command_type("/QUEST"), CommandType::Unknown);
        assert_eq!(get_command_type(""), CommandType::Unknown);
    }

    #[test]
    fn quest_without_content_uses_default_text() {
        let result = handle_command("/quest", "", 1000);
        assert_eq!(result.command_type, CommandType::Quest);
        assert!(result.should_queue);
        let msg = result.queued_message.unwrap();
        assert_eq!(msg.text, DEFAULT_QUEST_TEXT);
        assert_eq!(msg.id, "msg_1000");
        assert!(msg.is_command);
        assert_eq!(msg.command.as_deref(), Some("quest"));
        assert_eq!(
            result.response_text.as_deref(),
            Some("Quest request queued. Qoder will pick it up when ready.")
        );
    }

    #[test]
    fn quest_alias_uses_canonical_name() {
        let msg = handle_command("/q", "ship it", 5).queued_message.unwrap();
        assert_eq!(msg.command.as_deref(), Some("quest"));
        assert_eq!(msg.text, "ship it");
    }

    #[test]
    fn chat_without_content_queues_empty_text() {
        let result = handle_command("/c", "", 7);
        assert!(result.should_queue);
        let msg = result.queued_message.unwrap();
        assert_eq!(msg.text, "");
        assert_eq!(msg.command.as_deref(), Some("chat"));
        assert_eq!(
            result.response_text.as_deref(),
            Some("Message queued for Qoder.")
        );
    }

    #[test]
    fn help_does_not_queue() {
        let result = handle_command("/help", "ignored", 1);
        assert_eq!(result.command_type, CommandType::Help);
        assert!(!result.should_queue);
        assert!(result.queued_message.is_none());
        let text = result.response_text.unwrap();
        assert!(text.starts_with("**Available Commands**"));
        assert!(text.contains("/quest <task> or /q <task>"));
        assert!(!text.contains("/status"));
    }

    #[test]
    fn unknown_is_silent() {
        let result = handle_command("/start", "x", 1);
        assert_eq!(result.command_type, CommandType::Unknown);
        assert!(!result.should_queue);
        assert!(result.queued_message.is_none());
        assert!(result.response_text.is_none());
    }

    #[test]
    fn status_is_unknown_unless_enabled() {
        assert_eq!(
            handle_command("/status", "", 1).command_type,
            CommandType::Unknown
        );

        let router = CommandRouter::new("Qoder", true);
        let result = router.route("/status", "", 1);
        assert_eq!(result.command_type, CommandType::Status);
        assert!(!result.should_queue);
        assert!(result.response_text.is_none());
    }

    #[test]
    fn help_lists_status_when_enabled() {
        let router = CommandRouter::new("Astra", true);
        let text = router.route("/help", "", 1).response_text.unwrap();
        assert!(text.contains("/status - Check queue status\n/help - Show this help"));
        assert!(text.ends_with("it will be queued for Astra."));
    }

    #[test]
    fn confirmations_use_agent_name() {
        let router = CommandRouter::new("Astra", false);
        assert_eq!(
            router.route("/chat", "hi", 1).response_text.as_deref(),
            Some("Message queued for Astra.")
        );
    }
}
