use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::{EventKind, HubStats};

// ---------------------------------------------------------------------------
// Request models
// ---------------------------------------------------------------------------

/// Body of `POST /api/events`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime: u64,
    pub connections: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub connections: usize,
    pub connections_accepted: u64,
    pub events_relayed: u64,
    pub events_rejected: u64,
    pub started_at: String,
}

impl From<HubStats> for StatsResponse {
    fn from(stats: HubStats) -> Self {
        StatsResponse {
            connections: stats.connections,
            connections_accepted: stats.connections_accepted,
            events_relayed: stats.events_relayed,
            events_rejected: stats.events_rejected,
            started_at: stats.started_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<EventKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub event: String,
    pub delivered: usize,
}
