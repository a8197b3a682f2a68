//! Import pipeline integration tests
//!
//! Exercise scan_and_import over an in-memory object store and an
//! in-memory SQLite catalog.

use base64::Engine;
use manhwa_import::catalog::{Catalog, CatalogEntry, CatalogError, NewCatalogEntry, SqliteCatalog};
use manhwa_import::models::RunStatus;
use manhwa_import::services::ImportService;
use manhwa_import::storage::{MemoryObjectStore, ObjectStore};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

// One connection so the in-memory schema is shared across the pool
async fn test_catalog() -> Arc<SqliteCatalog> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    Arc::new(SqliteCatalog::new(pool).await.unwrap())
}

fn service(
    store: Arc<MemoryObjectStore>,
    catalog: Arc<SqliteCatalog>,
) -> ImportService {
    ImportService::new(store, catalog, "generated/", "imported/")
}

async fn put_json(store: &MemoryObjectStore, key: &str, value: serde_json::Value) {
    store
        .put(key, serde_json::to_vec(&value).unwrap(), "application/json")
        .await
        .unwrap();
}

#[tokio::test]
async fn unique_complete_payload_imports_once() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/solo.json",
        json!({
            "complete_data": {"chapters": []},
            "title": "Solo Ascent",
            "genre": "Action, Fantasy",
            "synopsis": "A hunter climbs alone.",
        }),
    )
    .await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.scanned, 1);
    assert_eq!(result.imported, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.imported_titles, vec!["Solo Ascent"]);

    // Source archived, entry created
    assert!(!store.exists("generated/solo.json").await.unwrap());
    assert!(store.exists("imported/solo.json").await.unwrap());

    let entry = catalog.find_by_title("Solo Ascent").await.unwrap().unwrap();
    assert_eq!(entry.genre, vec!["action", "fantasy"]);
    assert_eq!(entry.file_type, "complete");
    assert_eq!(entry.source_file, "generated/solo.json");
    assert!(entry.generated);
}

#[tokio::test]
async fn duplicate_title_archives_without_creating() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/dup.json",
        json!({"title": "Tower Of Dawn", "synopsis": "again"}),
    )
    .await;

    // Pre-existing entry with different casing
    catalog
        .create(NewCatalogEntry {
            title: "tower of dawn".to_string(),
            author: "A".to_string(),
            genre: vec!["drama".to_string()],
            status: "completed".to_string(),
            description: "first".to_string(),
            cover_image: None,
            generated: true,
            source_file: "generated/earlier.json".to_string(),
            file_type: "story".to_string(),
            generated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.scanned, 1);
    assert_eq!(result.imported, 0);
    assert_eq!(result.failed, 0);
    assert!(result.imported_titles.is_empty());

    // Archived anyway so it isn't rescanned
    assert!(store.exists("imported/dup.json").await.unwrap());
    assert!(!store.exists("generated/dup.json").await.unwrap());
    assert_eq!(catalog.count().await.unwrap(), 1);
}

#[tokio::test]
async fn metadata_payload_is_archived_without_counting() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(&store, "generated/meta.json", json!({"type": "meta"})).await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.scanned, 1);
    assert_eq!(result.imported, 0);
    assert_eq!(result.failed, 0);
    assert!(store.exists("imported/meta.json").await.unwrap());
    assert_eq!(catalog.count().await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_json_stays_in_place_and_counts_failed() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    store
        .put("generated/bad.json", b"{not json".to_vec(), "application/json")
        .await
        .unwrap();

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.scanned, 1);
    assert_eq!(result.imported, 0);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("generated/bad.json: "));

    // Left for retry / manual inspection
    assert!(store.exists("generated/bad.json").await.unwrap());
    assert!(!store.exists("imported/bad.json").await.unwrap());
}

#[tokio::test]
async fn unrecognized_shape_stays_in_place_and_counts_failed() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(&store, "generated/odd.json", json!({"foo": 1})).await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.failed, 1);
    assert!(store.exists("generated/odd.json").await.unwrap());
}

#[tokio::test]
async fn second_scan_is_idempotent() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/one.json",
        json!({"title": "Once", "synopsis": "only once"}),
    )
    .await;

    let import = service(store.clone(), catalog.clone());
    let first = import.scan_and_import().await;
    assert_eq!(first.imported, 1);

    let second = import.scan_and_import().await;
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.scanned, 0);
    assert_eq!(second.imported, 0);
    assert_eq!(catalog.count().await.unwrap(), 1);
}

#[tokio::test]
async fn end_to_end_two_object_scenario() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/a.json",
        json!({"title": "X", "synopsis": "Y"}),
    )
    .await;
    put_json(&store, "generated/b.json", json!({"type": "meta"})).await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.scanned, 2);
    assert_eq!(result.imported, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.imported_titles, vec!["X"]);

    assert!(store.exists("imported/a.json").await.unwrap());
    assert!(store.exists("imported/b.json").await.unwrap());
    assert!(store.list("generated/", true).await.unwrap().is_empty());
    assert_eq!(catalog.count().await.unwrap(), 1);
    assert!(catalog.find_by_title("X").await.unwrap().is_some());
}

#[tokio::test]
async fn unavailable_store_skips_the_whole_scan() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    store.set_available(false);

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    match result.status {
        RunStatus::Skipped { .. } => {}
        other => panic!("Expected skipped, got {:?}", other),
    }
    assert_eq!(result.scanned, 0);
    assert_eq!(result.imported, 0);
}

#[tokio::test]
async fn non_json_objects_are_not_scanned() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    store
        .put("generated/cover.png", vec![0u8; 16], "image/png")
        .await
        .unwrap();

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.scanned, 0);
    assert!(store.exists("generated/cover.png").await.unwrap());
}

#[tokio::test]
async fn embedded_art_is_decoded_and_stored() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    let cover = base64::engine::general_purpose::STANDARD.encode(b"cover-bytes");
    let character = base64::engine::general_purpose::STANDARD.encode(b"character-bytes");
    put_json(
        &store,
        "generated/art.json",
        json!({
            "title": "Painted",
            "synopsis": "with art",
            "cover_art": {"image_base64": cover},
            "character_art": {"image_base64": character},
        }),
    )
    .await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;
    assert_eq!(result.imported, 1);

    // Cover key derives from a hash of the source object key
    let hash = hex::encode(Sha256::digest(b"generated/art.json"));
    let cover_key = format!("covers/generated_{}_cover.png", &hash[..8]);
    assert_eq!(store.get(&cover_key).await.unwrap(), b"cover-bytes");

    let entry = catalog.find_by_title("Painted").await.unwrap().unwrap();
    let cover_url = entry.cover_image.expect("cover url recorded");
    assert!(cover_url.ends_with(&cover_key));

    // Character art keyed by the new entity id
    let art_key = format!("characters/{}_character.png", entry.id);
    assert_eq!(store.get(&art_key).await.unwrap(), b"character-bytes");
}

#[tokio::test]
async fn invalid_cover_base64_does_not_fail_the_import() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/badart.json",
        json!({
            "title": "No Cover",
            "synopsis": "still imports",
            "cover_art": {"image_base64": "!!!not-base64!!!"},
        }),
    )
    .await;

    let import = service(store.clone(), catalog.clone());
    let result = import.scan_and_import().await;

    assert_eq!(result.imported, 1);
    assert_eq!(result.failed, 0);
    let entry = catalog.find_by_title("No Cover").await.unwrap().unwrap();
    assert!(entry.cover_image.is_none());
}

/// Catalog that fails every create, for persistence-error paths
struct FailingCatalog;

#[async_trait::async_trait]
impl Catalog for FailingCatalog {
    async fn find_by_title(&self, _title: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(None)
    }

    async fn create(&self, _entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError> {
        Err(CatalogError::Malformed("create rejected".to_string()))
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        Ok(0)
    }
}

#[tokio::test]
async fn catalog_create_failure_leaves_object_for_retry() {
    let store = Arc::new(MemoryObjectStore::new());
    put_json(
        &store,
        "generated/fail.json",
        json!({"title": "Doomed", "synopsis": "never lands"}),
    )
    .await;

    let import = ImportService::new(
        store.clone(),
        Arc::new(FailingCatalog),
        "generated/",
        "imported/",
    );
    let result = import.scan_and_import().await;

    assert_eq!(result.imported, 0);
    assert_eq!(result.failed, 1);
    assert!(result.errors[0].starts_with("generated/fail.json: "));
    // Left in place so the next pass retries it
    assert!(store.exists("generated/fail.json").await.unwrap());
}

#[tokio::test]
async fn import_status_reports_counts_and_cache() {
    let store = Arc::new(MemoryObjectStore::new());
    let catalog = test_catalog().await;
    put_json(
        &store,
        "generated/s.json",
        json!({"title": "Stat", "synopsis": "s"}),
    )
    .await;

    let import = service(store.clone(), catalog.clone());

    let before = import.import_status().await.unwrap();
    assert_eq!(before.generated_files, 1);
    assert_eq!(before.imported_files, 0);
    assert!(before.last_scan.is_none());

    import.scan_and_import().await;

    let after = import.import_status().await.unwrap();
    assert_eq!(after.generated_files, 0);
    assert_eq!(after.imported_files, 1);
    assert_eq!(after.processed_cache_size, 1);
    assert!(after.last_scan.is_some());
}
