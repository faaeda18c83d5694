//! Notification core
//!
//! The per-user connection registry and the event dispatcher that fans
//! notification events out to live connections.

mod dispatcher;
mod registry;

pub use dispatcher::*;
pub use registry::*;
