//! Live connection registry
//!
//! In-memory, process-local directory of open notification connections per
//! user identity. A user may hold several connections at once (one per
//! browser tab); each appears in exactly one entry, and only after its
//! identity has been bound by the session handler. Registry state is not
//! persisted: after a restart clients must reconnect and re-handshake.

use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::server::UserRole;

/// Sender half of a connection's outbound queue
///
/// Payloads pushed here are written to the WebSocket by the session task
/// that owns the transport.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// A registry reference to one live connection
///
/// The physical transport is owned by its session task; the handle carries
/// just enough to identify the connection and queue outbound payloads.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Unique identifier for this connection
    id: Uuid,
    /// When the transport was accepted
    opened_at: SystemTime,
    /// Role carried on the bind frame, if any
    role: Option<UserRole>,
    /// Outbound payload queue into the owning session task
    sender: OutboundSender,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection
    pub fn new(sender: OutboundSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            opened_at: SystemTime::now(),
            role: None,
            sender,
        }
    }

    /// Set the role bound at handshake
    pub fn with_role(mut self, role: Option<UserRole>) -> Self {
        self.role = role;
        self
    }

    /// Get the connection ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the accept timestamp
    pub fn opened_at(&self) -> SystemTime {
        self.opened_at
    }

    /// Get the bound role, if one was supplied
    pub fn role(&self) -> Option<UserRole> {
        self.role
    }

    /// Whether the owning session is still draining its queue
    pub fn is_writable(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a serialized payload for this connection
    ///
    /// Returns false if the session has already shut down; the caller
    /// skips the connection in that case.
    pub fn push(&self, payload: String) -> bool {
        self.sender.send(payload).is_ok()
    }
}

/// Per-user directory of live connections
///
/// The only shared mutable state in the hub. Mutated by session handlers on
/// bind and close; read-only for the dispatcher. Constructed once at startup
/// and passed by `Arc` to both (no ambient global).
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<String, Vec<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a bound connection under a user identity
    ///
    /// Creates the entry if the user has no other live connections. The
    /// caller guarantees a connection is registered at most once.
    pub async fn register(&self, user_id: impl Into<String>, handle: ConnectionHandle) {
        let user_id = user_id.into();
        let connection_id = handle.id();
        let mut entries = self.entries.write().await;
        entries.entry(user_id.clone()).or_default().push(handle);
        debug!("Registered connection {} for user {}", connection_id, user_id);
    }

    /// Remove a connection from a user's entry
    ///
    /// Deletes the entry when its last connection goes away, so empty
    /// entries never linger. A miss is a benign no-op: close handlers can
    /// race with other cleanup.
    pub async fn unregister(&self, user_id: &str, connection_id: Uuid) {
        let mut entries = self.entries.write().await;
        if let Some(handles) = entries.get_mut(user_id) {
            handles.retain(|h| h.id() != connection_id);
            if handles.is_empty() {
                entries.remove(user_id);
            }
            debug!("Unregistered connection {} for user {}", connection_id, user_id);
        }
    }

    /// Snapshot of a user's live connections
    ///
    /// Returns an empty vec for unknown users. Later registry mutations do
    /// not affect the returned snapshot.
    pub async fn connections_for(&self, user_id: &str) -> Vec<ConnectionHandle> {
        let entries = self.entries.read().await;
        entries.get(user_id).cloned().unwrap_or_default()
    }

    /// Snapshot of every live connection across all users
    pub async fn all_connections(&self) -> Vec<ConnectionHandle> {
        let entries = self.entries.read().await;
        entries.values().flatten().cloned().collect()
    }

    /// Users that currently have at least one live connection
    pub async fn bound_users(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries.keys().cloned().collect()
    }

    /// Total number of live connections
    pub async fn connection_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().map(Vec::len).sum()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
