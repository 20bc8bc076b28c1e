//! Tool argument schemas.

use relay_core::Priority;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Parameters for `request_approval`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RequestApprovalParams {
    /// Short title for the approval request
    pub title: String,
    /// Detailed description of what needs approval
    pub description: String,
    /// Additional context or code snippet (optional)
    #[serde(default)]
    pub context: Option<String>,
}

/// Parameters for `send_prompt`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SendPromptParams {
    /// The question or prompt to send to the user
    pub question: String,
    /// Optional list of suggested options
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Notification priority as accepted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriorityParam {
    /// Low priority
    Low,
    /// Normal priority
    #[default]
    Normal,
    /// High priority
    High,
}

impl From<PriorityParam> for Priority {
    fn from(p: PriorityParam) -> Self {
        match p {
            PriorityParam::Low => Priority::Low,
            PriorityParam::Normal => Priority::Normal,
            PriorityParam::High => Priority::High,
        }
    }
}

/// Parameters for `notify`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NotifyParams {
    /// The notification message to send
    pub message: String,
    /// Priority level
    #[serde(default)]
    pub priority: Option<PriorityParam>,
}

/// Parameters for `get_pending_messages`.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetPendingMessagesParams {
    /// If true, returns messages without clearing the queue (default: false)
    #[serde(default)]
    pub peek: bool,
}

/// Parameters for `send_message`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    /// The message to send to the user
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default() {
        let approval: RequestApprovalParams =
            serde_json::from_value(serde_json::json!({"title": "t", "description": "d"})).unwrap();
        assert!(approval.context.is_none());

        let pending: GetPendingMessagesParams =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!pending.peek);

        let notify: NotifyParams =
            serde_json::from_value(serde_json::json!({"message": "m"})).unwrap();
        assert_eq!(
            Priority::from(notify.priority.unwrap_or_default()),
            Priority::Normal
        );
    }

    #[test]
    fn priority_is_lowercase() {
        let notify: NotifyParams =
            serde_json::from_value(serde_json::json!({"message": "m", "priority": "high"}))
                .unwrap();
        assert_eq!(notify.priority, Some(PriorityParam::High));

        let bad = serde_json::from_value::<NotifyParams>(
            serde_json::json!({"message": "m", "priority": "urgent"}),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn required_fields_are_enforced() {
        assert!(serde_json::from_value::<SendPromptParams>(serde_json::json!({})).is_err());
        assert!(
            serde_json::from_value::<RequestApprovalParams>(serde_json::json!({"title": "t"}))
                .is_err()
        );
    }
}
