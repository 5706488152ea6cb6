use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::relay::EventKind;

use super::errors::ApiError;
use super::models::*;
use super::state::SharedState;

// =========================================================================
// Health
// =========================================================================

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        connections: state.hub.connection_count().await,
    })
}

// =========================================================================
// Stats
// =========================================================================

/// GET /api/stats
pub async fn stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(state.hub.stats().await.into())
}

// =========================================================================
// Events
// =========================================================================

/// GET /api/events: names the hub relays.
pub async fn list_events() -> Json<EventListResponse> {
    Json(EventListResponse {
        events: EventKind::ALL.to_vec(),
    })
}

/// POST /api/events: relay an event to every connected client.
///
/// Lets producers without a socket (cron jobs, webhooks) publish.
pub async fn publish_event(
    State(state): State<SharedState>,
    Json(input): Json<PublishRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let delivery = state.hub.dispatch(None, &input.event, input.args).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            event: input.event,
            delivered: delivery.delivered,
        }),
    ))
}
