// crates/shellbridge-server/src/session.rs
// ============================================================================
// Module: Session Manager
// Description: SSE session lifecycle, lookup, and per-session ordering.
// Purpose: Multiplex per-client state across concurrent stream connections.
// Dependencies: rand, tokio
// ============================================================================

//! ## Overview
//! Each SSE connection owns one session: an opaque identifier, an outbound
//! message channel, and an inbound work queue. Identifiers come from a
//! boot-scoped generator (random boot id plus a monotonic counter) so they
//! are unique for the life of the process and never reused after a close.
//! The manager's map uses short critical sections on a std mutex; slow
//! handlers never hold it.
//!
//! ## Invariants
//! - A session is absent, open, or closed; closed is terminal and its id is
//!   never minted again.
//! - Accepted requests enter the per-session FIFO work queue from the
//!   transport handler, so a single worker draining the queue observes them
//!   in acceptance order. Responses leave in that order and writes on one
//!   channel never interleave. Different sessions proceed concurrently.
//! - Closing a session does not abort an in-flight handler; its response is
//!   discarded when the channel is gone.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::jsonrpc::JsonRpcRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Outbound and work queue capacity per session.
const SESSION_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Session lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session channel is gone (client disconnected).
    #[error("session closed: {0}")]
    Closed(String),
}

// ============================================================================
// SECTION: Id Generation
// ============================================================================

/// Boot-scoped session id generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct SessionIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for ids issued in this process.
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Creates a generator seeded from the OS random source.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new session id.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("sess-{:016x}-{:016x}", self.boot_id, seq)
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// One open SSE session.
pub struct Session {
    /// Opaque session identifier.
    id: String,
    /// Outbound serialized message channel.
    tx: mpsc::Sender<String>,
    /// Inbound request queue drained by the session worker.
    work: mpsc::Sender<JsonRpcRequest>,
}

impl Session {
    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queues a request for the session worker.
    ///
    /// Acceptance order on this queue is the order responses leave the
    /// session, so callers must enqueue before acknowledging the request.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the worker is gone.
    pub async fn enqueue(&self, request: JsonRpcRequest) -> Result<(), SessionError> {
        self.work
            .send(request)
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))
    }

    /// Sends a serialized message to the session stream.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the client has disconnected.
    pub async fn send(&self, payload: String) -> Result<(), SessionError> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))
    }
}

/// Channels and guard handed to the transport when a session opens.
pub struct OpenSession {
    /// Shared session handle registered in the manager.
    pub session: Arc<Session>,
    /// Receiver for outbound serialized messages.
    pub payloads: mpsc::Receiver<String>,
    /// Receiver for queued requests, drained by one worker task.
    pub work: mpsc::Receiver<JsonRpcRequest>,
    /// Removes the session from the manager on drop.
    pub guard: SessionGuard,
}

// ============================================================================
// SECTION: Session Manager
// ============================================================================

/// Open session registry shared by the transports.
pub struct SessionManager {
    /// Open sessions by id. Critical sections are short; no await inside.
    sessions: Mutex<BTreeMap<String, Arc<Session>>>,
    /// Id generator for this process.
    generator: SessionIdGenerator,
}

impl SessionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
            generator: SessionIdGenerator::new(),
        }
    }

    /// Opens a session: mints an id, binds its channels, returns the handles.
    pub fn open(manager: &Arc<Self>) -> OpenSession {
        let id = manager.generator.issue();
        let (tx, payloads) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let (work_tx, work) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let session = Arc::new(Session {
            id: id.clone(),
            tx,
            work: work_tx,
        });
        if let Ok(mut sessions) = manager.sessions.lock() {
            sessions.insert(id.clone(), Arc::clone(&session));
        }
        let guard = SessionGuard {
            manager: Arc::clone(manager),
            id,
        };
        OpenSession {
            session,
            payloads,
            work,
            guard,
        }
    }

    /// Looks up an open session; `None` for unknown or closed ids.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().ok().and_then(|sessions| sessions.get(id).cloned())
    }

    /// Closes a session, removing its binding and dropping the channel.
    ///
    /// Returns true when the session was open.
    pub fn close(&self, id: &str) -> bool {
        self.sessions.lock().is_ok_and(|mut sessions| sessions.remove(id).is_some())
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the session when the owning SSE stream is dropped.
pub struct SessionGuard {
    /// Owning manager.
    manager: Arc<SessionManager>,
    /// Guarded session id.
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.close(&self.id);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::JsonRpcRequest;
    use super::SessionError;
    use super::SessionIdGenerator;
    use super::SessionManager;

    #[test]
    fn issued_ids_are_unique() {
        let generator = SessionIdGenerator::new();
        let mut seen = BTreeSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generator.issue()));
        }
    }

    #[tokio::test]
    async fn open_lookup_close_lifecycle() {
        let manager = Arc::new(SessionManager::new());
        let opened = SessionManager::open(&manager);
        let id = opened.session.id().to_string();
        assert!(manager.lookup(&id).is_some());
        assert_eq!(manager.open_count(), 1);
        drop(opened);
        // Closed is terminal: the id is gone and never reused.
        assert!(manager.lookup(&id).is_none());
        let next = SessionManager::open(&manager);
        assert_ne!(next.session.id(), id);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let manager = Arc::new(SessionManager::new());
        let opened = SessionManager::open(&manager);
        let id = opened.session.id().to_string();
        assert!(manager.close(&id));
        assert!(!manager.close(&id));
        drop(opened);
    }

    #[tokio::test]
    async fn send_after_receiver_drop_reports_closed() {
        let manager = Arc::new(SessionManager::new());
        let opened = SessionManager::open(&manager);
        drop(opened.payloads);
        let err = opened.session.send("payload".to_string()).await.expect_err("closed");
        assert_eq!(err, SessionError::Closed(opened.session.id().to_string()));
    }

    #[tokio::test]
    async fn messages_arrive_in_send_order() {
        let manager = Arc::new(SessionManager::new());
        let mut opened = SessionManager::open(&manager);
        for n in 0..5 {
            opened.session.send(format!("msg-{n}")).await.expect("send");
        }
        for n in 0..5 {
            assert_eq!(opened.payloads.recv().await.expect("recv"), format!("msg-{n}"));
        }
    }

    #[tokio::test]
    async fn queued_requests_drain_in_acceptance_order() {
        let manager = Arc::new(SessionManager::new());
        let mut opened = SessionManager::open(&manager);
        for n in 0..5_i64 {
            let request = JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                id: serde_json::json!(n),
                method: "tools/list".to_string(),
                params: None,
            };
            opened.session.enqueue(request).await.expect("enqueue");
        }
        for n in 0..5_i64 {
            let request = opened.work.recv().await.expect("recv");
            assert_eq!(request.id, serde_json::json!(n));
        }
    }

    #[tokio::test]
    async fn enqueue_after_worker_drop_reports_closed() {
        let manager = Arc::new(SessionManager::new());
        let opened = SessionManager::open(&manager);
        drop(opened.work);
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: serde_json::json!(1),
            method: "tools/list".to_string(),
            params: None,
        };
        let err = opened.session.enqueue(request).await.expect_err("closed");
        assert_eq!(err, SessionError::Closed(opened.session.id().to_string()));
    }
}
