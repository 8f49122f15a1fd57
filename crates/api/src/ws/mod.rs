//! WebSocket infrastructure for real-time dispatch.
//!
//! Provides the connection registry, heartbeat monitoring, and the HTTP
//! upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod registry;

pub use handler::{ws_handler, ConnectParams};
pub use heartbeat::start_heartbeat;
pub use registry::ConnectionRegistry;
