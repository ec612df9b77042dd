//! Triage scheduler API handlers.

use axum::{extract::State, Json};
use std::sync::Arc;
use triage_core::SchedulerStatus;

use crate::state::AppState;

/// Queue depth, in-flight attempts and the recovery flag
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status())
}
