//! MCP server exposing the relay as five tools.

use std::sync::Arc;

use relay_core::{Priority, Relay, ToolResult};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::schema_for_type,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{stdin, stdout};
use tracing::{debug, info};

use crate::params::{
    GetPendingMessagesParams, NotifyParams, RequestApprovalParams, SendMessageParams,
    SendPromptParams,
};

/// `request_approval`
pub const REQUEST_APPROVAL: &str = "request_approval";
/// `send_prompt`
pub const SEND_PROMPT: &str = "send_prompt";
/// `notify`
pub const NOTIFY: &str = "notify";
/// `get_pending_messages`
pub const GET_PENDING_MESSAGES: &str = "get_pending_messages";
/// `send_message`
pub const SEND_MESSAGE: &str = "send_message";

/// MCP server over a shared [`Relay`].
///
/// Cheap to clone; every SSE session gets its own clone.
#[derive(Clone)]
pub struct RelayMcpServer {
    relay: Arc<Relay>,
}

impl std::fmt::Debug for RelayMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayMcpServer")
            .field("relay", &self.relay)
            .finish()
    }
}

impl RelayMcpServer {
    /// Create a server for `relay`.
    #[must_use]
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    /// The relay behind the tools.
    #[must_use]
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Tool definitions.
    #[must_use]
    pub fn tools() -> Vec<Tool> {
        vec![
            Tool::new(
                REQUEST_APPROVAL,
                "Request approval from the user via Telegram. Sends a message with Approve/Deny buttons and waits for response.",
                schema_for_type::<RequestApprovalParams>(),
            ),
            Tool::new(
                SEND_PROMPT,
                "Send a prompt/question to the user via Telegram and wait for their text response.",
                schema_for_type::<SendPromptParams>(),
            ),
            Tool::new(
                NOTIFY,
                "Send a notification to the user via Telegram (no response expected).",
                schema_for_type::<NotifyParams>(),
            ),
            Tool::new(
                GET_PENDING_MESSAGES,
                "Get any pending messages sent by the user via Telegram. Returns queued messages and clears the queue.",
                schema_for_type::<GetPendingMessagesParams>(),
            ),
            Tool::new(
                SEND_MESSAGE,
                "Send a message to the user via Telegram.",
                schema_for_type::<SendMessageParams>(),
            ),
        ]
    }

    /// Run tool `name` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_params` for an unknown tool or arguments that do not
    /// match its schema. Failures while talking to the chat are not errors
    /// here; they come back as a [`ToolResult::Error`].
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<ToolResult, McpError> {
        debug!(tool = name, "Tool called");
        let result = match name {
            REQUEST_APPROVAL => {
                let p: RequestApprovalParams = parse_params(arguments)?;
                self.relay
                    .request_approval(&p.title, &p.description, p.context.as_deref())
                    .await
            },
            SEND_PROMPT => {
                let p: SendPromptParams = parse_params(arguments)?;
                self.relay
                    .send_prompt(&p.question, p.options.as_deref().unwrap_or_default())
                    .await
            },
            NOTIFY => {
                let p: NotifyParams = parse_params(arguments)?;
                let priority = p.priority.map(Priority::from).unwrap_or_default();
                self.relay.notify(&p.message, priority).await
            },
            GET_PENDING_MESSAGES => {
                let p: GetPendingMessagesParams = parse_params(arguments)?;
                self.relay.get_pending_messages(p.peek)
            },
            SEND_MESSAGE => {
                let p: SendMessageParams = parse_params(arguments)?;
                self.relay.send_message(&p.message).await
            },
            other => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {other}"),
                    None,
                ));
            },
        };
        debug!(tool = name, status = result.status(), "Tool finished");
        Ok(result)
    }

    /// Serve MCP over stdin/stdout until the client disconnects.
    ///
    /// Counts as one active connection while running.
    ///
    /// # Errors
    ///
    /// Returns an error if the MCP handshake fails or the session ends
    /// abnormally.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        let _connection = self.relay.track_connection();
        info!("Starting MCP server on stdio");
        let server = self.serve(stdio()).await?;
        info!("MCP client connected");
        server.waiting().await?;
        info!("MCP stdio session closed");
        Ok(())
    }
}

fn stdio() -> (tokio::io::Stdin, tokio::io::Stdout) {
    (stdin(), stdout())
}

fn parse_params<P: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<P, McpError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {e}"), None))
}

fn to_call_result(result: &ToolResult) -> CallToolResult {
    let content = vec![Content::text(result.to_json())];
    if result.is_error() {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for RelayMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "telegram-relay".to_string(),
                title: Some("Telegram Relay MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Relays between this agent and one Telegram chat. Use request_approval for \
                 yes/no decisions, send_prompt for free-text answers, notify and send_message \
                 for one-way messages, and get_pending_messages to read what the user queued \
                 with /quest, /chat or plain text."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            meta: None,
            tools: Self::tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.dispatch(&request.name, request.arguments).await?;
        Ok(to_call_result(&result))
    }
}
