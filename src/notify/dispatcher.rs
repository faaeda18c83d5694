//! Event dispatcher
//!
//! The push API used by request handlers after a state mutation commits.
//! Resolves target connections through the registry and queues the
//! serialized event on each. Delivery is fire-and-forget: a user with no
//! live connections simply misses the notification, and no failure here is
//! ever surfaced to the producing request. The authoritative signal remains
//! the HTTP response for the underlying mutation.

use std::sync::Arc;

use tracing::{debug, error};

use super::registry::{ConnectionHandle, ConnectionRegistry};
use crate::server::{Event, UserRole};

/// Resolves notification targets and performs the push writes
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    /// Create a dispatcher over a shared registry
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push an event to every live connection of one user
    ///
    /// Returns the number of connections the payload was queued on. Zero
    /// means the user had no live connections and the event was dropped.
    pub async fn send_to_user(&self, user_id: &str, event: &Event) -> usize {
        let targets = self.registry.connections_for(user_id).await;
        let delivered = self.push_to(&targets, event);
        debug!(
            "Dispatched {:?} to user {} ({}/{} connections)",
            event.kind,
            user_id,
            delivered,
            targets.len()
        );
        delivered
    }

    /// Push an event to every live connection, regardless of identity
    pub async fn send_to_all(&self, event: &Event) -> usize {
        let targets = self.registry.all_connections().await;
        let delivered = self.push_to(&targets, event);
        debug!(
            "Broadcast {:?} to {}/{} connections",
            event.kind,
            delivered,
            targets.len()
        );
        delivered
    }

    /// Push an event to every connection bound with the given role
    ///
    /// Connections whose bind frame carried no role are never matched.
    pub async fn send_to_role(&self, role: UserRole, event: &Event) -> usize {
        let targets: Vec<ConnectionHandle> = self
            .registry
            .all_connections()
            .await
            .into_iter()
            .filter(|h| h.role() == Some(role))
            .collect();
        let delivered = self.push_to(&targets, event);
        debug!(
            "Dispatched {:?} to role {:?} ({}/{} connections)",
            event.kind,
            role,
            delivered,
            targets.len()
        );
        delivered
    }

    /// Serialize once and queue on each target, skipping dead sessions
    fn push_to(&self, targets: &[ConnectionHandle], event: &Event) -> usize {
        if targets.is_empty() {
            return 0;
        }

        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for handle in targets {
            // push() fails only when the session task is already gone;
            // that connection is skipped and the rest still receive it
            if handle.push(payload.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}
