use std::sync::Arc;

use crate::config::AppConfig;
use crate::relay::RelayHub;

/// Shared application state passed to all handlers via Axum's State extractor.
#[derive(Debug)]
pub struct AppState {
    pub hub: RelayHub,
    pub config: AppConfig,
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(AppState {
            hub: RelayHub::new(&config),
            config,
            start_time: std::time::Instant::now(),
        })
    }
}
