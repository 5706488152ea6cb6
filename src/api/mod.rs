//! HTTP surface: health, stats, HTTP publishing and the WebSocket route.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
