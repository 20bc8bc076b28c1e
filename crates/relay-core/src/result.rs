//! Tool-call result payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RelayResult;
use crate::format::PendingMessages;

/// JSON payload returned by every tool, tagged by `status`.
///
/// A result is either a success-family payload or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    /// `{"status":"success", ...fields}`
    Success(Map<String, Value>),
    /// Approve button pressed.
    Approved {
        /// Always `true`.
        approved: bool,
        /// `Request was APPROVED`.
        message: String,
    },
    /// Deny button pressed.
    Denied {
        /// Always `false`.
        approved: bool,
        /// `Request was DENIED`.
        message: String,
    },
    /// Nobody answered in time. Not an error.
    Timeout {
        /// Present for approvals.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The call failed.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ToolResult {
    /// `{"status":"success"}`
    #[must_use]
    pub fn success() -> Self {
        Self::Success(Map::new())
    }

    /// Success carrying the fields of `payload`, which must serialize to an
    /// object; other values land under `result`.
    pub fn success_with<T: Serialize>(payload: &T) -> RelayResult<Self> {
        let fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            },
        };
        Ok(Self::Success(fields))
    }

    /// `{"status":"success","response":...}` for an answered prompt.
    pub fn response(text: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("response".to_string(), Value::String(text.into()));
        Self::Success(map)
    }

    /// Result of an approval decision.
    #[must_use]
    pub fn decision(approved: bool) -> Self {
        if approved {
            Self::Approved {
                approved: true,
                message: "Request was APPROVED".to_string(),
            }
        } else {
            Self::Denied {
                approved: false,
                message: "Request was DENIED".to_string(),
            }
        }
    }

    /// Timeout of an approval request.
    #[must_use]
    pub fn approval_timeout() -> Self {
        Self::Timeout {
            message: Some("Approval request timed out".to_string()),
        }
    }

    /// Timeout of a prompt.
    #[must_use]
    pub fn prompt_timeout() -> Self {
        Self::Timeout { message: None }
    }

    /// `{"status":"error","message":...}`
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The `status` tag.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Approved { .. } => "approved",
            Self::Denied { .. } => "denied",
            Self::Timeout { .. } => "timeout",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this is an error payload.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Serialize to a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","message":{}}}"#,
                Value::String(e.to_string())
            )
        })
    }
}

impl From<PendingMessages> for ToolResult {
    fn from(pending: PendingMessages) -> Self {
        Self::success_with(&pending).unwrap_or_else(|e| Self::error(e.to_string()))
    }
}
