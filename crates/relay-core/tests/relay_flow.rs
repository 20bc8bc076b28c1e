//! End-to-end relay behavior against a recording transport.

use std::time::Duration;

use relay_core::{
    CallbackOrigin, CallbackOutcome, ChatId, DeliveryMode, InboundCallback, InboundOutcome,
    Markup, Priority, RelaySettings, Reply, RequestKind,
};
use relay_test::{
    FIRST_MESSAGE_ID, FOREIGN_CHAT, INBOUND_MESSAGE_ID, MockTransport, TEST_CHAT, foreign_text,
    inbound_callback, inbound_text, setup_test_logging, test_relay, test_relay_with,
    test_settings,
};
use serde_json::{Value, json};

const WAIT: Duration = Duration::from_secs(2);

fn payload(result: &relay_core::ToolResult) -> Value {
    serde_json::from_str(&result.to_json()).unwrap()
}

#[tokio::test]
async fn plain_text_is_queued_and_confirmed() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let outcome = relay.handle_text(inbound_text("  deploy when ready ")).await;

    assert!(matches!(outcome, InboundOutcome::Queued { .. }));
    let queued = relay.queue().get_all();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].text, "deploy when ready");
    assert!(!queued[0].is_command);

    let sent = mock.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.text, "Message queued. Qoder will pick it up.");
    assert_eq!(sent[0].message.reply_to, Some(INBOUND_MESSAGE_ID));
    assert_eq!(sent[0].chat, TEST_CHAT);
}

#[tokio::test]
async fn foreign_chat_and_empty_messages_are_ignored() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    assert_eq!(
        relay.handle_text(foreign_text("hello")).await,
        InboundOutcome::Ignored
    );
    let mut no_text = inbound_text("x");
    no_text.text = None;
    assert_eq!(relay.handle_text(no_text).await, InboundOutcome::Ignored);

    assert!(relay.queue().is_empty());
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn quest_command_queues_with_default_text() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    relay.handle_text(inbound_text("/q@RelayBot")).await;

    let queued = relay.queue().get_all();
    assert_eq!(queued[0].text, "New Quest requested");
    assert_eq!(queued[0].command.as_deref(), Some("quest"));
    assert_eq!(
        mock.sent_texts(),
        vec!["Quest request queued. Qoder will pick it up when ready."]
    );
}

#[tokio::test]
async fn help_replies_without_queueing() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    assert_eq!(
        relay.handle_text(inbound_text("/help")).await,
        InboundOutcome::Replied
    );
    assert!(relay.queue().is_empty());
    let sent = mock.last_sent().unwrap();
    assert_eq!(sent.message.markup, Markup::Markdown);
    assert!(sent.message.text.starts_with("**Available Commands**"));
}

#[tokio::test]
async fn unknown_command_is_silent() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    assert_eq!(
        relay.handle_text(inbound_text("/start")).await,
        InboundOutcome::Ignored
    );
    assert_eq!(
        relay.handle_text(inbound_text("/status")).await,
        InboundOutcome::Ignored
    );
    assert!(mock.sent().is_empty());
    assert!(relay.queue().is_empty());
}

#[tokio::test]
async fn status_reports_counters_in_http_mode() {
    let mock = MockTransport::new();
    let settings = test_settings()
        .with_delivery(DeliveryMode::Webhook)
        .with_status_command(true);
    let relay = test_relay_with(&mock, settings);
    let _guard = relay.track_connection();

    relay.handle_text(inbound_text("queued one")).await;
    relay.handle_text(inbound_text("/status")).await;

    assert_eq!(
        mock.last_sent().unwrap().message.text,
        "**Queue Status**\n\nPending messages: 1\nActive MCP connections: 1\nMode: Webhook"
    );
}

#[tokio::test]
async fn connection_guard_counts() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    assert_eq!(relay.active_connections(), 0);
    let first = relay.track_connection();
    let second = relay.track_connection();
    assert_eq!(relay.active_connections(), 2);
    drop(first);
    assert_eq!(relay.active_connections(), 1);
    drop(second);
    assert_eq!(relay.active_connections(), 0);
}

#[tokio::test]
async fn pending_messages_peek_then_drain() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    relay.handle_text(inbound_text("one")).await;
    relay.handle_text(inbound_text("/chat two")).await;

    let peeked = payload(&relay.get_pending_messages(true));
    assert_eq!(peeked["status"], "success");
    assert_eq!(peeked["count"], 2);
    assert_eq!(peeked["messages"][0]["type"], "message");
    assert_eq!(peeked["messages"][1]["type"], "chat");
    assert_eq!(relay.queue().len(), 2);

    let drained = payload(&relay.get_pending_messages(false));
    assert_eq!(drained["count"], 2);
    assert!(relay.queue().is_empty());

    let empty = payload(&relay.get_pending_messages(false));
    assert_eq!(empty, json!({"status": "success", "count": 0, "messages": []}));
}

#[tokio::test]
async fn approval_resolved_by_button() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let waiter = {
        let relay = relay.clone();
        tokio::spawn(async move {
            relay
                .request_approval("Deploy", "Push v2 to prod", Some("diff --git"))
                .await
        })
    };

    let sent = mock.wait_for_sent(1, WAIT).await;
    let request = &sent[0];
    assert_eq!(request.message.markup, Markup::Markdown);
    assert!(request.message.text.starts_with("**Approval Request**"));
    let data = mock.last_button_data().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data[0].starts_with("approve:req_"));
    assert!(data[1].starts_with("deny:req_"));

    let outcome = relay
        .handle_callback(inbound_callback(
            &data[0],
            request.message_id,
            "Approval Request",
        ))
        .await;
    assert!(matches!(
        outcome,
        CallbackOutcome::Resolved {
            reply: Reply::Approved,
            ..
        }
    ));

    let result = waiter.await.unwrap();
    assert_eq!(
        payload(&result),
        json!({"status": "approved", "approved": true, "message": "Request was APPROVED"})
    );

    let edits = mock.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].message_id, request.message_id);
    assert_eq!(edits[0].text, "Approval Request\n\n**Response: APPROVED**");
    assert_eq!(
        mock.answers(),
        vec![(
            format!("cb-{}", request.message_id),
            Some("APPROVED".to_string())
        )]
    );
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn any_other_action_denies() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let waiter = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.request_approval("t", "d", None).await })
    };
    mock.wait_for_sent(1, WAIT).await;
    let data = mock.last_button_data().unwrap();
    let id = data[0].trim_start_matches("approve:").to_string();

    relay
        .handle_callback(inbound_callback(&format!("nope:{id}"), FIRST_MESSAGE_ID, "x"))
        .await;

    let result = payload(&waiter.await.unwrap());
    assert_eq!(result["status"], "denied");
    assert_eq!(result["approved"], false);
}

#[tokio::test]
async fn second_click_is_expired() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let waiter = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.request_approval("t", "d", None).await })
    };
    mock.wait_for_sent(1, WAIT).await;
    let data = mock.last_button_data().unwrap();

    let first = relay
        .handle_callback(inbound_callback(&data[1], FIRST_MESSAGE_ID, "x"))
        .await;
    let second = relay
        .handle_callback(inbound_callback(&data[0], FIRST_MESSAGE_ID, "x"))
        .await;
    assert!(matches!(first, CallbackOutcome::Resolved { .. }));
    assert_eq!(second, CallbackOutcome::Expired);
    assert_eq!(payload(&waiter.await.unwrap())["status"], "denied");
    assert_eq!(
        mock.answers().last().unwrap().1.as_deref(),
        Some("Request expired")
    );
}

#[tokio::test]
async fn approval_edit_keeps_original_text_literal() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    let request = relay.pending().register(RequestKind::Approval, WAIT);

    relay
        .handle_callback(inbound_callback(
            &format!("approve:{}", request.id()),
            FIRST_MESSAGE_ID,
            "Approval Request\n\nrm *.tmp in my_dir",
        ))
        .await;

    assert_eq!(
        mock.edits()[0].text,
        "Approval Request\n\nrm \\*.tmp in my\\_dir\n\n**Response: APPROVED**"
    );
}

#[tokio::test]
async fn malformed_callback_data_is_answered() {
    setup_test_logging("relay_core=debug");
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let outcome = relay
        .handle_callback(inbound_callback("test", FIRST_MESSAGE_ID, "x"))
        .await;

    assert_eq!(outcome, CallbackOutcome::Expired);
    assert_eq!(
        mock.answers(),
        vec![(
            format!("cb-{FIRST_MESSAGE_ID}"),
            Some("Request expired".to_string())
        )]
    );
}

#[tokio::test]
async fn callbacks_from_other_chats_are_ignored() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    let request = relay.pending().register(RequestKind::Approval, WAIT);

    let callback = InboundCallback {
        id: "cb".to_string(),
        data: Some(format!("approve:{}", request.id())),
        message: Some(CallbackOrigin {
            chat: FOREIGN_CHAT,
            message_id: 1,
            text: None,
        }),
    };
    assert_eq!(relay.handle_callback(callback).await, CallbackOutcome::Ignored);
    assert!(relay.pending().contains(request.id()));
    assert!(mock.answers().is_empty());
}

#[tokio::test]
async fn prompt_answers_do_not_resolve_approvals() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    let prompt = relay.pending().register(RequestKind::Prompt, WAIT);

    let outcome = relay
        .handle_callback(inbound_callback(&format!("approve:{}", prompt.id()), 1, "x"))
        .await;
    assert_eq!(outcome, CallbackOutcome::Expired);
    assert!(relay.pending().contains(prompt.id()));
}

#[tokio::test(start_paused = true)]
async fn approval_timeout_clears_buttons() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let result = relay.request_approval("t", "d", None).await;

    assert_eq!(
        payload(&result),
        json!({"status": "timeout", "message": "Approval request timed out"})
    );
    assert_eq!(mock.cleared(), vec![(TEST_CHAT, FIRST_MESSAGE_ID)]);
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn approval_send_failure_is_error_without_leak() {
    let mock = MockTransport::failing();
    let relay = test_relay(&mock);

    let result = relay.request_approval("t", "d", None).await;

    assert!(result.is_error());
    assert!(payload(&result)["message"]
        .as_str()
        .unwrap()
        .contains("chat not found"));
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn prompt_answered_by_free_text() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let waiter = {
        let relay = relay.clone();
        tokio::spawn(async move {
            relay
                .send_prompt("Which branch?", &["main".to_string(), "dev".to_string()])
                .await
        })
    };
    let sent = mock.wait_for_sent(1, WAIT).await;
    assert!(sent[0].message.text.contains("1. main\n2. dev"));

    let outcome = relay.handle_text(inbound_text("dev")).await;
    assert!(matches!(outcome, InboundOutcome::Answered { .. }));
    assert!(relay.queue().is_empty());

    assert_eq!(
        payload(&waiter.await.unwrap()),
        json!({"status": "success", "response": "dev"})
    );
    assert_eq!(mock.last_sent().unwrap().message.text, "Received your response.");
}

#[tokio::test]
async fn commands_never_answer_prompts() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);
    let prompt = relay.pending().register(RequestKind::Prompt, WAIT);

    relay.handle_text(inbound_text("/chat not an answer")).await;

    assert!(relay.pending().contains(prompt.id()));
    assert_eq!(relay.queue().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn prompt_timeout() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let result = relay.send_prompt("Anyone?", &[]).await;

    assert_eq!(payload(&result), json!({"status": "timeout"}));
    assert!(relay.pending().is_empty());
    assert!(mock.cleared().is_empty());
}

#[tokio::test]
async fn prompt_send_failure() {
    let mock = MockTransport::failing();
    let relay = test_relay(&mock);

    let result = relay.send_prompt("q", &[]).await;

    assert_eq!(payload(&result)["status"], "error");
    assert!(relay.pending().is_empty());
}

#[tokio::test]
async fn cancelled_prompt_leaves_no_entry() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    let waiter = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.send_prompt("q", &[]).await })
    };
    mock.wait_for_sent(1, WAIT).await;
    assert_eq!(relay.pending().len(), 1);

    waiter.abort();
    let _ = waiter.await;
    assert!(relay.pending().is_empty());

    let outcome = relay.handle_text(inbound_text("late answer")).await;
    assert!(matches!(outcome, InboundOutcome::Queued { .. }));
}

#[tokio::test]
async fn notify_and_send_message() {
    let mock = MockTransport::new();
    let relay = test_relay(&mock);

    assert_eq!(
        payload(&relay.notify("Build green", Priority::High).await),
        json!({"status": "success"})
    );
    assert_eq!(
        payload(&relay.send_message("plain *words*").await),
        json!({"status": "success"})
    );

    let texts = mock.sent_texts();
    assert_eq!(texts[0], "! **Notification from Qoder**\n\nBuild green");
    assert_eq!(texts[1], "plain *words*");
    assert!(mock.sent().iter().all(|r| r.message.markup == Markup::Markdown));
}

#[tokio::test]
async fn notify_failure_is_error_payload() {
    let mock = MockTransport::failing();
    let relay = test_relay(&mock);

    let result = payload(&relay.notify("x", Priority::Normal).await);
    assert_eq!(result["status"], "error");
    assert_eq!(
        result["message"],
        "chat transport error: Bad Request: chat not found"
    );
}

#[tokio::test]
async fn announce_online_is_plain_text() {
    let mock = MockTransport::new();
    let relay = test_relay_with(
        &mock,
        RelaySettings::new(ChatId(42)).with_delivery(DeliveryMode::Webhook),
    );

    relay.announce_online().await.unwrap();

    let sent = mock.last_sent().unwrap();
    assert_eq!(sent.message.text, "MCP Server online!\nMode: Webhook");
    assert_eq!(sent.message.markup, Markup::Plain);
}
