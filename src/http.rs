use crate::forward::ForwarderStats;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpState {
    pub stats: Arc<ForwarderStats>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    events_received: u64,
    events_forwarded: u64,
    delivery_errors: u64,
    encode_errors: u64,
    mqtt_connected: bool,
    last_event_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_status(State(state): State<HttpState>) -> Json<StatusResponse> {
    let stats = &state.stats;
    let last_event_ms = stats.last_event_unix_ms.load(Ordering::Relaxed);
    let last_event_at = if last_event_ms == 0 {
        None
    } else {
        Utc.timestamp_millis_opt(last_event_ms as i64).single()
    };
    let last_error = stats
        .last_error
        .lock()
        .ok()
        .and_then(|guard| guard.clone());

    Json(StatusResponse {
        events_received: stats.events_received.load(Ordering::Relaxed),
        events_forwarded: stats.events_forwarded.load(Ordering::Relaxed),
        delivery_errors: stats.delivery_errors.load(Ordering::Relaxed),
        encode_errors: stats.encode_errors.load(Ordering::Relaxed),
        mqtt_connected: stats.mqtt_connected.load(Ordering::Relaxed),
        last_event_at,
        last_error,
    })
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/status", get(get_status))
        .with_state(state)
}
