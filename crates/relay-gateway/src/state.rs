//! State shared by every route.

use std::future::Future;
use std::sync::Arc;

use relay_core::Relay;
use relay_mcp::RelayMcpServer;
use tokio::sync::watch;

use crate::session::{Session, SessionRegistry};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct GatewayState {
    relay: Arc<Relay>,
    sessions: SessionRegistry,
    closing: Arc<watch::Sender<bool>>,
}

impl GatewayState {
    /// State serving `relay`.
    #[must_use]
    pub fn new(relay: Arc<Relay>) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            relay,
            sessions: SessionRegistry::new(),
            closing: Arc::new(closing),
        }
    }

    /// The relay behind the routes.
    #[must_use]
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Open SSE sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// End every open SSE stream. New streams end immediately.
    pub fn close_sessions(&self) {
        self.closing.send_replace(true);
    }

    pub(crate) fn open_session(&self) -> Session {
        let server = RelayMcpServer::new(Arc::clone(&self.relay));
        self.sessions.open(server, self.relay.track_connection())
    }

    /// Resolves once [`close_sessions`](Self::close_sessions) is called.
    pub(crate) fn closed(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut rx = self.closing.subscribe();
        async move {
            let _ = rx.wait_for(|closing| *closing).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use relay_test::{MockTransport, test_relay};

    use super::*;

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let mock = MockTransport::new();
        let state = GatewayState::new(test_relay(&mock));

        let pending = state.closed();
        state.close_sessions();
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap();

        // Already closed.
        tokio::time::timeout(Duration::from_secs(1), state.closed())
            .await
            .unwrap();
    }
}
