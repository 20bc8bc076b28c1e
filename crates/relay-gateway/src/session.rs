//! SSE session registry.
//!
//! Each `GET /sse` gets its own MCP server instance wired to an in-memory
//! pipe. Bodies posted to `/messages` are written into the pipe, and
//! whatever the server writes back is streamed out as SSE events.

use std::sync::Arc;

use dashmap::DashMap;
use relay_core::ConnectionGuard;
use relay_mcp::RelayMcpServer;
use rmcp::ServiceExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Pipe buffer per session.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Posted bodies waiting to be written into a session's pipe.
const INBOX_CAPACITY: usize = 32;

/// Open SSE sessions by id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, mpsc::Sender<String>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether `id` names an open session.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub(crate) fn inbox(&self, id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Start an MCP server for a new session and register it.
    pub(crate) fn open(&self, server: RelayMcpServer, connection: ConnectionGuard) -> Session {
        let id = Uuid::new_v4().to_string();
        let (client_io, server_io) = tokio::io::duplex(PIPE_CAPACITY);

        let session_id = id.clone();
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(server_io);
            match server.serve((read, write)).await {
                Ok(running) => {
                    if let Err(e) = running.waiting().await {
                        warn!(%session_id, "MCP session ended with error: {e}");
                    }
                },
                Err(e) => warn!(%session_id, "MCP session failed to initialize: {e}"),
            }
            debug!(%session_id, "MCP session finished");
        });

        let (read, mut write) = tokio::io::split(client_io);
        let (tx, mut rx) = mpsc::channel::<String>(INBOX_CAPACITY);
        tokio::spawn(async move {
            while let Some(body) = rx.recv().await {
                let line = format!("{body}\n");
                if write.write_all(line.as_bytes()).await.is_err() || write.flush().await.is_err()
                {
                    break;
                }
            }
        });

        self.sessions.insert(id.clone(), tx);
        debug!(session_id = %id, open = self.len(), "SSE session opened");

        Session {
            outbound: BufReader::new(read).lines(),
            _guard: SessionGuard {
                id: id.clone(),
                registry: self.clone(),
                _connection: connection,
            },
            id,
        }
    }

    fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }
}

/// The stream side of an open session.
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) outbound: Lines<BufReader<ReadHalf<DuplexStream>>>,
    _guard: SessionGuard,
}

/// Unregisters the session and releases its connection count on drop.
struct SessionGuard {
    id: String,
    registry: SessionRegistry,
    _connection: ConnectionGuard,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        debug!(session_id = %self.id, "SSE session closed");
    }
}

#[cfg(test)]
mod tests {
    use relay_test::{MockTransport, test_relay};

    use super::*;

    #[tokio::test]
    async fn open_registers_and_drop_unregisters() {
        let mock = MockTransport::new();
        let relay = test_relay(&mock);
        let registry = SessionRegistry::new();

        let session = registry.open(
            RelayMcpServer::new(Arc::clone(&relay)),
            relay.track_connection(),
        );
        assert!(registry.contains(&session.id));
        assert!(registry.inbox(&session.id).is_some());
        assert_eq!(relay.active_connections(), 1);

        let id = session.id.clone();
        drop(session);
        assert!(!registry.contains(&id));
        assert!(registry.is_empty());
        assert_eq!(relay.active_connections(), 0);
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let mock = MockTransport::new();
        let relay = test_relay(&mock);
        let registry = SessionRegistry::new();

        let a = registry.open(RelayMcpServer::new(Arc::clone(&relay)), relay.track_connection());
        let b = registry.open(RelayMcpServer::new(Arc::clone(&relay)), relay.track_connection());
        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
    }
}
