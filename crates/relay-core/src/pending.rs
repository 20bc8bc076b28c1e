//! Pending-request correlation.
//!
//! An interactive tool call registers an entry, sends its chat message and
//! then waits. The entry is removed exactly once, by whichever comes first:
//! a matching chat event, the timeout, or the waiter going away. Removal
//! happens under the table lock and a reply is delivered while that lock is
//! held, so a timeout that finds the entry gone always finds the reply
//! already waiting in the channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::queue::now_millis;

/// Characters of the random request id suffix.
const ID_SUFFIX_LEN: usize = 7;

/// Deadline used when `now + timeout` overflows, about 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(946_080_000);

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a request id: `req_<timestamp>_<7 base-36 chars>`.
///
/// The random suffix keeps ids distinct within one millisecond.
#[must_use]
pub fn generate_request_id(timestamp: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();
    format!("req_{timestamp}_{suffix}")
}

/// What kind of answer an entry waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Approve/Deny buttons.
    Approval,
    /// Free-text reply.
    Prompt,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approval => f.write_str("approval"),
            Self::Prompt => f.write_str("prompt"),
        }
    }
}

/// A human answer delivered to a waiting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Approve button.
    Approved,
    /// Deny (or any non-approve) button.
    Denied,
    /// Free text.
    Text(String),
}

impl Reply {
    /// Decode a button action: `approve` approves, anything else denies.
    #[must_use]
    pub fn from_action(action: &str) -> Self {
        if action == "approve" {
            Self::Approved
        } else {
            Self::Denied
        }
    }

    /// `APPROVED`, `DENIED` or the text itself.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::Text(text) => text,
        }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A chat event answered.
    Replied(Reply),
    /// The timeout fired first. Carries the chat message id, if recorded.
    TimedOut {
        /// Id of the chat message that carried the request.
        message_id: Option<i32>,
    },
    /// The entry was removed without an answer.
    Discarded,
}

struct PendingEntry {
    id: String,
    kind: RequestKind,
    message_id: Option<i32>,
    reply_tx: oneshot::Sender<Reply>,
}

/// Table of in-flight interactive requests, in registration order.
#[derive(Clone, Default)]
pub struct PendingTable {
    entries: Arc<Mutex<Vec<PendingEntry>>>,
}

impl std::fmt::Debug for PendingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTable")
            .field("len", &self.len())
            .finish()
    }
}

impl PendingTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request of `kind` that expires after `timeout`.
    #[must_use]
    pub fn register(&self, kind: RequestKind, timeout: Duration) -> PendingRequest {
        let (reply_tx, reply_rx) = oneshot::channel();
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        let mut entries = self.lock();
        let mut id = generate_request_id(now_millis());
        while entries.iter().any(|e| e.id == id) {
            id = generate_request_id(now_millis());
        }
        entries.push(PendingEntry {
            id: id.clone(),
            kind,
            message_id: None,
            reply_tx,
        });
        drop(entries);

        debug!(request_id = %id, %kind, "Registered pending request");
        PendingRequest {
            id,
            deadline,
            table: self.clone(),
            reply_rx: Some(reply_rx),
        }
    }

    fn claim(&self, pick: impl Fn(&PendingEntry) -> bool, reply: Reply) -> Option<String> {
        let mut entries = self.lock();
        let idx = entries.iter().position(pick)?;
        let entry = entries.remove(idx);
        // Delivered under the lock; see module docs.
        let _ = entry.reply_tx.send(reply);
        Some(entry.id)
    }

    /// Resolve the entry with `id`. Returns `false` if it is already gone.
    pub fn resolve_by_id(&self, id: &str, reply: Reply) -> bool {
        self.claim(|e| e.id == id, reply).is_some()
    }

    /// Resolve the entry with `id` only if it is of `kind`.
    pub fn resolve_kind(&self, id: &str, kind: RequestKind, reply: Reply) -> bool {
        self.claim(|e| e.id == id && e.kind == kind, reply)
            .is_some()
    }

    /// Resolve the earliest-registered entry of `kind`, returning its id.
    ///
    /// With several prompts outstanding the oldest one wins, whichever one
    /// the user meant to answer.
    pub fn resolve_first(&self, kind: RequestKind, reply: Reply) -> Option<String> {
        self.claim(|e| e.kind == kind, reply)
    }

    /// Record the chat message id that carries request `id`.
    pub fn attach_message(&self, id: &str, message_id: i32) -> bool {
        match self.lock().iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.message_id = Some(message_id);
                true
            },
            None => false,
        }
    }

    /// Remove `id` without answering. Returns whether it was present.
    pub fn discard(&self, id: &str) -> bool {
        self.take(id).is_some()
    }

    fn take(&self, id: &str) -> Option<PendingEntry> {
        let mut entries = self.lock();
        let idx = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(idx))
    }

    /// Whether `id` is still pending.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|e| e.id == id)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Handle held by the tool call that registered an entry.
///
/// Dropping the handle without waiting removes the entry.
#[derive(Debug)]
pub struct PendingRequest {
    id: String,
    deadline: Instant,
    table: PendingTable,
    reply_rx: Option<oneshot::Receiver<Reply>>,
}

impl PendingRequest {
    /// The generated request id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for an answer or the deadline.
    pub async fn wait(mut self) -> Completion {
        let Some(mut reply_rx) = self.reply_rx.take() else {
            return Completion::Discarded;
        };

        match tokio::time::timeout_at(self.deadline, &mut reply_rx).await {
            Ok(Ok(reply)) => Completion::Replied(reply),
            Ok(Err(_)) => Completion::Discarded,
            Err(_) => match self.table.take(&self.id) {
                Some(entry) => {
                    debug!(request_id = %self.id, "Pending request timed out");
                    Completion::TimedOut {
                        message_id: entry.message_id,
                    }
                },
                // Claimed by a reply right at the deadline.
                None => reply_rx
                    .try_recv()
                    .map_or(Completion::Discarded, Completion::Replied),
            },
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.table.discard(&self.id) {
            debug!(request_id = %self.id, "Pending request abandoned");
        }
    }
}
