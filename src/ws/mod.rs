//! WebSocket module: client connections to the relay.
//!
//! - [`messages`]: Wire frames (inbound parse, outbound serialize).
//! - [`manager`]: Connection registry and bounded fan-out.
//! - [`handler`]: Axum WebSocket upgrade handler.

pub mod handler;
pub mod manager;
pub mod messages;

pub use handler::ws_handler;
pub use manager::{ConnectionId, ConnectionRegistry};
pub use messages::Frame;
