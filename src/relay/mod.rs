//! Relay core: the event table and the hub that fans events out.
//!
//! - [`events`]: Recognized event names and their forwarding rules.
//! - [`hub`]: Connection lifecycle and dispatch.

pub mod events;
pub mod hub;

pub use events::{EventKind, ForwardRule};
pub use hub::{HubStats, RelayHub};
