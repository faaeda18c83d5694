//! Wire format definitions
//!
//! Defines the JSON frames exchanged over the notification WebSocket:
//! the client→server bind frame and the server→client notification events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted inbound frame size (64KB)
///
/// The only meaningful inbound frame is the bind frame, which is tiny;
/// anything larger is discarded without parsing.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_BYTES})")]
    FrameTooLarge(usize),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Client Frames
// ============================================================================

/// User roles in the back-office portals
///
/// Carried optionally on the bind frame so role-scoped broadcasts can be
/// resolved against live connections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Customer portal user
    Customer,
    /// Field technician
    Technician,
    /// Back-office administrator
    Admin,
}

/// Frames sent from a client to the hub
///
/// The bind frame is the only frame the hub acts on. Everything else parses
/// into `Unrecognized` and is discarded by the session handler, so a
/// malformed or premature frame can never take a connection down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Identity-binding handshake, sent once after the connection opens
    Auth {
        /// Opaque user identifier, as issued by the session layer
        #[serde(rename = "userId")]
        user_id: String,
        /// Portal role, enables role-scoped broadcasts when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<UserRole>,
    },

    /// Any frame with an unknown `type` tag
    #[serde(other)]
    Unrecognized,
}

impl ClientFrame {
    /// Parse an inbound text frame
    ///
    /// Frames with an unknown `type` tag parse successfully into
    /// [`ClientFrame::Unrecognized`]; only invalid JSON, a missing tag, or
    /// an oversized frame produce an error. Callers treat both errors and
    /// `Unrecognized` as the discard path.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        if text.len() > MAX_FRAME_BYTES {
            return Err(ProtocolError::FrameTooLarge(text.len()));
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Create an Auth frame without a role
    pub fn auth(user_id: impl Into<String>) -> Self {
        ClientFrame::Auth {
            user_id: user_id.into(),
            role: None,
        }
    }

    /// Create an Auth frame with a role
    pub fn auth_with_role(user_id: impl Into<String>, role: UserRole) -> Self {
        ClientFrame::Auth {
            user_id: user_id.into(),
            role: Some(role),
        }
    }

    /// Serialize the frame to JSON
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Notification Events
// ============================================================================

/// Kinds of notification events pushed to clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A customer opened a new ticket
    NewTicket,
    /// A ticket's status changed
    TicketUpdate,
    /// A ticket was assigned to a technician
    TicketAssigned,
}

/// An immutable notification payload describing a completed state change
///
/// Constructed by request handlers after their mutation commits; the
/// dispatcher serializes and routes it without inspecting the contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Event kind tag
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Human-readable notification text, rendered as a toast client-side
    pub message: String,
    /// Identifier of the affected ticket, when one exists
    #[serde(rename = "ticketId", default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

impl Event {
    /// Create an event of the given kind
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ticket_id: None,
        }
    }

    /// Create a NewTicket event
    pub fn new_ticket(message: impl Into<String>) -> Self {
        Self::new(EventKind::NewTicket, message)
    }

    /// Create a TicketUpdate event
    pub fn ticket_update(message: impl Into<String>) -> Self {
        Self::new(EventKind::TicketUpdate, message)
    }

    /// Create a TicketAssigned event
    pub fn ticket_assigned(message: impl Into<String>) -> Self {
        Self::new(EventKind::TicketAssigned, message)
    }

    /// Attach the affected ticket's id
    pub fn with_ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    /// Serialize the event to its wire form
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an event from JSON (primarily for testing)
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Client Frame Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_auth_frame() {
        let frame = ClientFrame::parse(r#"{"type": "auth", "userId": "u-42"}"#).unwrap();
        assert_eq!(frame, ClientFrame::auth("u-42"));
    }

    #[test]
    fn test_parse_auth_frame_with_role() {
        let frame =
            ClientFrame::parse(r#"{"type": "auth", "userId": "u-42", "role": "admin"}"#).unwrap();
        assert_eq!(frame, ClientFrame::auth_with_role("u-42", UserRole::Admin));
    }

    #[test]
    fn test_auth_serialization_uses_camel_case() {
        let json = ClientFrame::auth("u-42").to_json().unwrap();
        assert!(json.contains("\"type\":\"auth\""));
        assert!(json.contains("\"userId\":\"u-42\""));
    }

    #[test]
    fn test_unknown_type_parses_as_unrecognized() {
        let frame = ClientFrame::parse(r#"{"type": "subscribe", "channel": "tickets"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Unrecognized);
    }

    #[test]
    fn test_parse_invalid_json_fails() {
        assert!(ClientFrame::parse("not json at all").is_err());
    }

    #[test]
    fn test_parse_missing_user_id_fails() {
        // An auth frame without its identity is unusable
        assert!(ClientFrame::parse(r#"{"type": "auth"}"#).is_err());
    }

    #[test]
    fn test_parse_missing_type_tag_fails() {
        assert!(ClientFrame::parse(r#"{"userId": "u-42"}"#).is_err());
    }

    #[test]
    fn test_parse_oversized_frame_fails() {
        let huge = format!(
            r#"{{"type": "auth", "userId": "{}"}}"#,
            "x".repeat(MAX_FRAME_BYTES)
        );
        let result = ClientFrame::parse(&huge);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge(_))));
    }

    // -------------------------------------------------------------------------
    // Event Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_new_ticket_serialization() {
        let event =
            Event::new_ticket("New installation ticket created by Alice").with_ticket_id("t-100");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"new_ticket\""));
        assert!(json.contains("\"message\":\"New installation ticket created by Alice\""));
        assert!(json.contains("\"ticketId\":\"t-100\""));
    }

    #[test]
    fn test_ticket_assigned_serialization() {
        let event =
            Event::ticket_assigned("A new ticket has been assigned to you").with_ticket_id("t-7");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"ticket_assigned\""));
        assert!(json.contains("\"ticketId\":\"t-7\""));
    }

    #[test]
    fn test_event_without_ticket_id_omits_field() {
        let json = Event::ticket_update("Maintenance window tonight")
            .to_json()
            .unwrap();
        assert!(!json.contains("ticketId"));
    }

    #[test]
    fn test_event_round_trip() {
        let event =
            Event::ticket_update("Ticket X status updated to completed").with_ticket_id("abc123");
        let json = event.to_json().unwrap();
        let parsed = Event::from_json(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventKind::NewTicket).unwrap(),
            "\"new_ticket\""
        );
        assert_eq!(
            serde_json::to_string(&EventKind::TicketUpdate).unwrap(),
            "\"ticket_update\""
        );
        assert_eq!(
            serde_json::to_string(&EventKind::TicketAssigned).unwrap(),
            "\"ticket_assigned\""
        );
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&UserRole::Technician).unwrap(),
            "\"technician\""
        );
        assert_eq!(
            serde_json::to_string(&UserRole::Customer).unwrap(),
            "\"customer\""
        );
    }
}
