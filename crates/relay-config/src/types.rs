//! Raw configuration schema, as merged from all layers.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How MCP clients connect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// HTTP server with SSE sessions.
    Http,
}

impl TransportMode {
    /// `stdio` or `http`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::invalid(
                "server.transport",
                format!("unknown transport '{other}'; expected stdio or http"),
            )),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot credentials and delivery.
    pub telegram: TelegramSection,
    /// MCP transport and HTTP listener.
    pub server: ServerSection,
    /// Relay behavior.
    pub relay: RelaySection,
    /// Logging.
    pub logging: LoggingSection,
}

/// A chat id written either as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChatId {
    /// `chat_id = -100123`
    Number(i64),
    /// `chat_id = "-100123"`
    Text(String),
}

/// `[telegram]`
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    /// Bot API token.
    pub bot_token: Option<String>,
    /// The one chat the relay serves.
    pub chat_id: Option<RawChatId>,
    /// Public base URL for webhook delivery.
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for TelegramSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSection")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("chat_id", &self.chat_id)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// MCP transport.
    pub transport: TransportMode,
    /// HTTP port.
    pub port: u16,
    /// HTTP bind address.
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            port: 3000,
            bind: "0.0.0.0".to_owned(),
        }
    }
}

/// `[relay]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Agent name shown in chat messages.
    pub agent_name: String,
    /// Approval wait in seconds.
    pub approval_timeout_secs: u64,
    /// Prompt wait in seconds.
    pub prompt_timeout_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            agent_name: "Qoder".to_owned(),
            approval_timeout_secs: 300,
            prompt_timeout_secs: 600,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level.
    pub level: String,
    /// `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// `stderr`, `stdout` or `file`.
    pub target: String,
    /// Log directory for the `file` target.
    pub directory: Option<String>,
    /// Extra filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}
