//! ISP back-office notification hub
//!
//! Real-time notification fan-out for the customer, technician, and admin
//! portals. Request handlers call the [`notify::EventDispatcher`] after a
//! state mutation commits; the dispatcher resolves live WebSocket
//! connections through the [`notify::ConnectionRegistry`] and pushes the
//! serialized event to each. Delivery is fire-and-forget: the HTTP response
//! for the underlying mutation remains the authoritative outcome.

pub mod config;
pub mod notify;
pub mod server;
