//! HTTP API tests
//!
//! Exercise the router with tower's oneshot against an in-memory
//! object store, without binding a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use manhwa_import::catalog::SqliteCatalog;
use manhwa_import::services::{ImportScheduler, ImportService, SchedulerConfig};
use manhwa_import::storage::{MemoryObjectStore, ObjectStore};
use manhwa_import::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    router: axum::Router,
    store: Arc<MemoryObjectStore>,
}

async fn test_app() -> TestApp {
    let store = Arc::new(MemoryObjectStore::new());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    let catalog = Arc::new(SqliteCatalog::new(pool).await.unwrap());
    let import = Arc::new(ImportService::new(
        store.clone(),
        catalog,
        "generated/",
        "imported/",
    ));
    let scheduler = Arc::new(ImportScheduler::new(
        Arc::clone(&import),
        SchedulerConfig {
            interval_minutes: 60,
            auto_import_enabled: false,
            startup_grace: Duration::from_secs(1),
        },
    ));
    let router = build_router(AppState::new(import, scheduler));
    TestApp { router, store }
}

async fn get(app: &TestApp, path: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: &TestApp, path: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(Request::post(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_module_and_version() {
    let app = test_app().await;
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "manhwa-import");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["scheduler_running"], false);
}

#[tokio::test]
async fn manual_scan_returns_full_result() {
    let app = test_app().await;
    let payload = json!({"title": "Via Http", "synopsis": "posted"});
    app.store
        .put(
            "generated/http.json",
            serde_json::to_vec(&payload).unwrap(),
            "application/json",
        )
        .await
        .unwrap();

    let (status, body) = post(&app, "/import/scan").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Import completed - 1 manhwa imported");
    assert_eq!(body["details"]["status"], "completed");
    assert_eq!(body["details"]["scanned"], 1);
    assert_eq!(body["details"]["imported"], 1);
    assert_eq!(body["details"]["imported_titles"][0], "Via Http");
}

#[tokio::test]
async fn background_scan_returns_accepted_and_runs() {
    let app = test_app().await;
    let payload = json!({"title": "Deferred", "synopsis": "later"});
    app.store
        .put(
            "generated/bg.json",
            serde_json::to_vec(&payload).unwrap(),
            "application/json",
        )
        .await
        .unwrap();

    let (status, body) = post(&app, "/import/background").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Background import started");

    // The spawned scan finishes shortly after the response
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if app.store.exists("imported/bg.json").await.unwrap() {
            break;
        }
    }
    assert!(app.store.exists("imported/bg.json").await.unwrap());
}

#[tokio::test]
async fn import_status_counts_both_prefixes() {
    let app = test_app().await;
    app.store
        .put("generated/a.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();
    app.store
        .put("imported/b.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();

    let (status, body) = get(&app, "/import/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated_files"], 1);
    assert_eq!(body["imported_files"], 1);
    assert_eq!(body["last_scan"], Value::Null);
    assert_eq!(body["processed_cache_size"], 0);
}

#[tokio::test]
async fn import_status_maps_unavailable_store_to_503() {
    let app = test_app().await;
    app.store.set_available(false);

    let (status, body) = get(&app, "/import/status").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn list_files_returns_json_keys_only() {
    let app = test_app().await;
    app.store
        .put("generated/x.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();
    app.store
        .put("generated/cover.png", vec![0u8; 4], "image/png")
        .await
        .unwrap();
    app.store
        .put("imported/y.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();

    let (status, body) = get(&app, "/import/files").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_generated"], 1);
    assert_eq!(body["total_imported"], 1);
    assert_eq!(body["generated_files"][0], "generated/x.json");
    assert_eq!(body["imported_files"][0], "imported/y.json");
}

#[tokio::test]
async fn scheduler_status_reflects_configuration() {
    let app = test_app().await;
    let (status, body) = get(&app, "/scheduler/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["auto_import_enabled"], false);
    assert_eq!(body["import_interval_minutes"], 60);
    assert_eq!(body["active_tasks"], json!([]));
}

#[tokio::test]
async fn scheduler_trigger_runs_one_pass() {
    let app = test_app().await;
    let payload = json!({"title": "Triggered", "synopsis": "now"});
    app.store
        .put(
            "generated/t.json",
            serde_json::to_vec(&payload).unwrap(),
            "application/json",
        )
        .await
        .unwrap();

    let (status, body) = post(&app, "/scheduler/trigger").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Scheduled import triggered");
    assert_eq!(body["details"]["imported"], 1);
    assert!(app.store.exists("imported/t.json").await.unwrap());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
