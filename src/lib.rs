//! Real-time event relay hub.
//!
//! Clients (stream overlays, chat bots, stats pollers, voting widgets)
//! connect over WebSocket and send named events; the hub relays each
//! recognized event to every other connected client.

pub mod api;
pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod ws;

pub use config::AppConfig;
pub use error::RelayError;
pub use relay::{EventKind, RelayHub};
