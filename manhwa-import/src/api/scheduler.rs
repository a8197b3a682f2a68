//! Scheduler endpoints
//!
//! GET /scheduler/status, POST /scheduler/trigger

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::models::{ImportRunResult, SchedulerStatus};
use crate::AppState;

/// GET /scheduler/status
pub async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// POST /scheduler/trigger response
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
    pub details: ImportRunResult,
}

/// POST /scheduler/trigger
///
/// Run one import pass out-of-band without disturbing the periodic
/// schedule.
pub async fn trigger_import(State(state): State<AppState>) -> Json<TriggerResponse> {
    let result = state.scheduler.trigger_import_now().await;
    Json(TriggerResponse {
        message: "Scheduled import triggered".to_string(),
        details: result,
    })
}

/// Build scheduler routes
pub fn scheduler_routes() -> Router<AppState> {
    Router::new()
        .route("/scheduler/status", get(scheduler_status))
        .route("/scheduler/trigger", post(trigger_import))
}
