//! Import pipeline endpoints
//!
//! POST /import/scan, POST /import/background, GET /import/status,
//! GET /import/files

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::models::ImportRunResult;
use crate::AppState;

/// POST /import/scan
///
/// Run one scan pass inline and return its full result.
pub async fn manual_scan(State(state): State<AppState>) -> Json<ScanResponse> {
    tracing::info!("Manual import scan triggered");
    let result = state.import.scan_and_import().await;

    Json(ScanResponse {
        message: format!("Import completed - {} manhwa imported", result.imported),
        details: result,
    })
}

/// POST /import/scan response
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub message: String,
    pub details: ImportRunResult,
}

/// POST /import/background
///
/// Spawn a scan pass without waiting for it. Returns 202 Accepted;
/// the outcome lands in the logs and in GET /import/status.
pub async fn background_scan(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let import = state.import.clone();
    tokio::spawn(async move {
        let result = import.scan_and_import().await;
        tracing::info!(
            imported = result.imported,
            failed = result.failed,
            "Background import scan finished"
        );
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({"message": "Background import started"})),
    )
}

/// GET /import/status
pub async fn import_status(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let status = state.import.import_status().await?;
    Ok(Json(serde_json::to_value(status).map_err(|e| {
        crate::error::ApiError::Internal(e.to_string())
    })?))
}

/// GET /import/files
///
/// JSON key listings of both prefixes, for debugging the bucket state.
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let (generated_files, imported_files) = state.import.list_files().await?;
    Ok(Json(json!({
        "total_generated": generated_files.len(),
        "total_imported": imported_files.len(),
        "generated_files": generated_files,
        "imported_files": imported_files,
    })))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/scan", post(manual_scan))
        .route("/import/background", post(background_scan))
        .route("/import/status", get(import_status))
        .route("/import/files", get(list_files))
}
