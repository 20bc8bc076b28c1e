//! Validation of the merged [`Config`] into typed [`Settings`].

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use relay_core::{ChatId, DeliveryMode, RelaySettings};
use relay_telemetry::{LogConfig, LogFormat, LogTarget};
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, RawChatId, TransportMode};

/// Longest an approval or prompt may wait.
const MAX_TIMEOUT_SECS: u64 = 604_800;

/// Fully validated settings for one run of the relay.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Bot API token.
    pub bot_token: String,
    /// The one chat the relay serves.
    pub chat: ChatId,
    /// Public base URL for webhook delivery.
    pub webhook_url: Option<Url>,
    /// MCP transport.
    pub transport: TransportMode,
    /// HTTP listen address.
    pub listen_addr: SocketAddr,
    /// Agent name shown in chat.
    pub agent_name: String,
    /// Approval wait.
    pub approval_timeout: Duration,
    /// Prompt wait.
    pub prompt_timeout: Duration,
    /// Logging setup.
    pub logging: LogConfig,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &"[REDACTED]")
            .field("chat", &self.chat)
            .field("webhook_url", &self.webhook_url)
            .field("transport", &self.transport)
            .field("listen_addr", &self.listen_addr)
            .field("agent_name", &self.agent_name)
            .field("approval_timeout", &self.approval_timeout)
            .field("prompt_timeout", &self.prompt_timeout)
            .field("logging", &self.logging)
            .finish()
    }
}

impl Settings {
    /// Webhook delivery needs both the HTTP transport and a public URL.
    #[must_use]
    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.transport == TransportMode::Http && self.webhook_url.is_some() {
            DeliveryMode::Webhook
        } else {
            DeliveryMode::Polling
        }
    }

    /// The URL registered with Telegram, `<webhook_url>/webhook`.
    #[must_use]
    pub fn webhook_endpoint(&self) -> Option<String> {
        if self.delivery_mode() != DeliveryMode::Webhook {
            return None;
        }
        self.webhook_url
            .as_ref()
            .map(|url| format!("{}/webhook", url.as_str().trim_end_matches('/')))
    }

    /// Settings for the relay core.
    #[must_use]
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings::new(self.chat)
            .with_agent_name(self.agent_name.clone())
            .with_timeouts(self.approval_timeout, self.prompt_timeout)
            .with_delivery(self.delivery_mode())
            .with_status_command(self.transport == TransportMode::Http)
    }
}

/// Validate a merged config.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first bad field.
pub fn validate(config: &Config) -> ConfigResult<Settings> {
    let bot_token = config
        .telegram
        .bot_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ConfigError::invalid(
                "telegram.bot_token",
                "required (set it in the config file or TELEGRAM_BOT_TOKEN)",
            )
        })?
        .to_owned();

    let chat = parse_chat_id(config.telegram.chat_id.as_ref())?;

    let webhook_url = match config.telegram.webhook_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_webhook_url(raw)?),
    };

    let bind: IpAddr = config.server.bind.parse().map_err(|_| {
        ConfigError::invalid(
            "server.bind",
            format!("'{}' is not an IP address", config.server.bind),
        )
    })?;

    let agent_name = config.relay.agent_name.trim();
    if agent_name.is_empty() {
        return Err(ConfigError::invalid("relay.agent_name", "must not be empty"));
    }

    let approval_timeout = timeout(
        "relay.approval_timeout_secs",
        config.relay.approval_timeout_secs,
    )?;
    let prompt_timeout = timeout("relay.prompt_timeout_secs", config.relay.prompt_timeout_secs)?;

    let transport = config.server.transport;
    let logging = log_config(config, transport)?;

    Ok(Settings {
        bot_token,
        chat,
        webhook_url,
        transport,
        listen_addr: SocketAddr::new(bind, config.server.port),
        agent_name: agent_name.to_owned(),
        approval_timeout,
        prompt_timeout,
        logging,
    })
}

fn parse_chat_id(raw: Option<&RawChatId>) -> ConfigResult<ChatId> {
    match raw {
        Some(RawChatId::Number(id)) => Ok(ChatId(*id)),
        Some(RawChatId::Text(text)) if !text.trim().is_empty() => text
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ConfigError::invalid("telegram.chat_id", format!("'{text}' is not an integer"))),
        _ => Err(ConfigError::invalid(
            "telegram.chat_id",
            "required (set it in the config file or TELEGRAM_CHAT_ID)",
        )),
    }
}

fn parse_webhook_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::invalid("telegram.webhook_url", format!("'{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "telegram.webhook_url",
            format!("scheme must be http or https, got '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn timeout(field: &str, secs: u64) -> ConfigResult<Duration> {
    if secs == 0 {
        return Err(ConfigError::invalid(field, "must be at least 1 second"));
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::invalid(
            field,
            format!("must be at most {MAX_TIMEOUT_SECS} seconds (7 days), got {secs}"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn log_config(config: &Config, transport: TransportMode) -> ConfigResult<LogConfig> {
    let section = &config.logging;
    let format = LogFormat::from_str(&section.format)
        .map_err(|e| ConfigError::invalid("logging.format", e.to_string()))?;

    let target = match section.target.to_ascii_lowercase().as_str() {
        "stderr" => LogTarget::Stderr,
        "stdout" if transport == TransportMode::Stdio => {
            return Err(ConfigError::invalid(
                "logging.target",
                "stdout carries the MCP protocol in stdio mode; use stderr or file",
            ));
        },
        "stdout" => LogTarget::Stdout,
        "file" => {
            let dir = section
                .directory
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| {
                    ConfigError::invalid("logging.directory", "required when target is 'file'")
                })?;
            LogTarget::File(PathBuf::from(dir))
        },
        other => {
            return Err(ConfigError::invalid(
                "logging.target",
                format!("unknown target '{other}'; expected stderr, stdout or file"),
            ));
        },
    };

    let mut logging = LogConfig::new(section.level.clone())
        .with_format(format)
        .with_target(target);
    for directive in &section.directives {
        logging = logging.with_directive(directive.clone());
    }
    Ok(logging)
}
