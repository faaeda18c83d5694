//! WebSocket server module
//!
//! Handles notification client connections: the upgrade endpoint, the
//! per-connection session handler, and the wire-format types.

mod protocol;
mod websocket;

pub use protocol::*;
pub use websocket::*;
