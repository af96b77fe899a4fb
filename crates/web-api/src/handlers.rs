use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use vote_tracker_core::{ExecutionMode, Snapshot};
use vote_tracker_orchestrator::{CurrentStateView, VoteTracker};

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Current tally with per-candidate velocity and the previous day's result.
///
/// In stateless mode this first recovers the previous day (once) and
/// fetches when the data is older than the fetch interval.
pub async fn current(State(tracker): State<Arc<VoteTracker>>) -> Json<CurrentStateView> {
    if tracker.settings().mode == ExecutionMode::Stateless {
        tracker.refresh_if_stale().await;
    }
    Json(tracker.current_state())
}

/// Snapshot history for charting.
pub async fn history(State(tracker): State<Arc<VoteTracker>>) -> Json<Vec<Snapshot>> {
    Json(tracker.history())
}

/// Triggers an immediate fetch without waiting for it.
pub async fn refresh(State(tracker): State<Arc<VoteTracker>>) -> Json<RefreshResponse> {
    tracker.trigger_refresh();
    Json(RefreshResponse {
        status: "ok",
        message: "Refresh triggered",
    })
}
