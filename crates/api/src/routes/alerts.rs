//! Alert Routes

use alerting::{derive_key, AlertEvent, AlertTarget, Decision};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::AppState;

/// Response for a submitted alert
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub status: String,
    pub detail: String,
    /// Coalescing key the alert was filed under
    pub key: String,
}

/// Submit an alert for debouncing
pub async fn schedule_alert(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AlertEvent>,
) -> (StatusCode, Json<ScheduleResponse>) {
    let key = derive_key(&event);
    let decision = state.debouncer.admit(event).await;
    debug!(key = %key, decision = %decision, "Alert admitted");

    metrics::counter!("alert_relay_decisions_total", "status" => decision.status()).increment(1);
    metrics::gauge!("alert_relay_pending_entries").set(state.debouncer.pending_count().await as f64);

    let code = match decision {
        Decision::Scheduled { .. } => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };

    (
        code,
        Json(ScheduleResponse {
            status: decision.status().to_string(),
            detail: decision.detail(),
            key: key.to_string(),
        }),
    )
}

/// Query parameters for the pending endpoint
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// A notification waiting for its debounce window to elapse
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingRecord {
    pub key: String,
    pub level: Option<String>,
    pub target: AlertTarget,
    /// Milliseconds until the notification fires
    pub due_in_ms: u64,
}

/// Response for the pending endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub data: Vec<PendingRecord>,
    pub count: usize,
    pub capacity: usize,
}

/// List pending notifications, soonest first
pub async fn get_pending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PendingQuery>,
) -> Json<PendingResponse> {
    let pending = state.debouncer.pending().await;
    let now = Instant::now();

    let data = pending
        .iter()
        .take(params.limit)
        .map(|entry| PendingRecord {
            key: entry.key.to_string(),
            level: entry.payload.level.clone(),
            target: entry.payload.target.clone(),
            due_in_ms: u64::try_from(entry.due_at.saturating_duration_since(now).as_millis())
                .unwrap_or(u64::MAX),
        })
        .collect();

    Json(PendingResponse {
        data,
        count: pending.len(),
        capacity: state.debouncer.capacity().await,
    })
}
