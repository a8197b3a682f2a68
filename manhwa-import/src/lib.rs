//! manhwa-import library interface
//!
//! Generated-asset import microservice: scans the object store for
//! generated manhwa payloads, catalogs new titles, and archives
//! handled objects, on a schedule or on demand.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{ImportScheduler, ImportService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Import pipeline over the configured bucket
    pub import: Arc<ImportService>,
    /// Periodic scheduler driving the pipeline
    pub scheduler: Arc<ImportScheduler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(import: Arc<ImportService>, scheduler: Arc<ImportScheduler>) -> Self {
        Self {
            import,
            scheduler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::scheduler_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
