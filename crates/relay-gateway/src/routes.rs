//! Route handlers and the router.

use std::convert::Infallible;

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// Build the router over `state`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sse", get(open_sse))
        .route("/messages", post(post_message))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Always `http`.
    pub transport: String,
    /// `webhook` or `polling`.
    pub mode: String,
    /// Messages waiting for the agent.
    pub queue_size: usize,
    /// Live MCP connections.
    pub active_connections: usize,
}

async fn health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let relay = state.relay();
    Json(HealthResponse {
        status: "ok".to_string(),
        transport: "http".to_string(),
        mode: relay.settings().delivery.as_str().to_string(),
        queue_size: relay.queue().len(),
        active_connections: relay.active_connections(),
    })
}

async fn open_sse(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = state.open_session();
    info!(session_id = %session.id, "SSE client connected");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session.id));

    let messages = stream::unfold(session, |mut session| async move {
        match session.outbound.next_line().await {
            Ok(Some(line)) => Some((Ok(Event::default().event("message").data(line)), session)),
            Ok(None) | Err(_) => {
                debug!(session_id = %session.id, "MCP session closed its pipe");
                None
            },
        }
    });

    let events = stream::once(async move { Ok(endpoint) })
        .chain(messages)
        .take_until(state.closed());

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<GatewayState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> GatewayResult<StatusCode> {
    let id = query.session_id.ok_or(GatewayError::MissingSession)?;
    let inbox = state
        .sessions()
        .inbox(&id)
        .ok_or(GatewayError::SessionNotFound)?;

    // Re-serialize so the body is a single line on the pipe.
    let message: serde_json::Value = serde_json::from_slice(&body)?;
    inbox
        .send(message.to_string())
        .await
        .map_err(|_| GatewayError::SessionNotFound)?;

    Ok(StatusCode::ACCEPTED)
}

async fn webhook(State(state): State<GatewayState>, body: Bytes) -> GatewayResult<StatusCode> {
    let update = relay_telegram::parse_update(&body)?;
    relay_telegram::dispatch_update(state.relay(), update).await;
    Ok(StatusCode::OK)
}
