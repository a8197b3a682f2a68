//! Generated-asset import pipeline
//!
//! One scan pass lists JSON payloads under the source prefix,
//! classifies each, deduplicates against the catalog by title,
//! persists accepted records (plus any embedded cover/character art)
//! and relocates handled source objects to the archive prefix.
//!
//! Objects are processed strictly sequentially in listing order: the
//! title-uniqueness check has no transactional guard, so concurrent
//! creation could race. Per-object errors never abort the scan; the
//! failing object stays under the source prefix for the next pass.

use crate::catalog::{Catalog, CatalogEntry, CatalogError, NewCatalogEntry};
use crate::models::{ImportRunResult, ImportStatus};
use crate::services::classifier::{self, Classification, ClassifiedRecord};
use crate::storage::{ObjectStore, StorageError};
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Per-object import failures (parse failures are handled separately)
#[derive(Debug, Error)]
enum ImportError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

/// Outcome of importing one classified record
enum ImportOutcome {
    /// New catalog entry created
    Created(CatalogEntry),
    /// Title already cataloged; nothing created
    Duplicate(CatalogEntry),
}

/// Import pipeline over one bucket
///
/// Shared state (the processed-object set and last-scan stamp) is
/// only touched from the single cooperative task driving a scan.
pub struct ImportService {
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn Catalog>,
    /// Prefix scanned for new payloads, e.g. `generated/`
    source_prefix: String,
    /// Prefix handled objects are relocated to, e.g. `imported/`
    archive_prefix: String,
    /// Keys handled during this process lifetime. Purely an
    /// optimization cache; the archive relocation is the durable
    /// "already handled" marker.
    processed: Mutex<HashSet<String>>,
    last_scan: RwLock<Option<DateTime<Utc>>>,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn Catalog>,
        source_prefix: impl Into<String>,
        archive_prefix: impl Into<String>,
    ) -> Self {
        let source_prefix = source_prefix.into();
        let archive_prefix = archive_prefix.into();
        info!(
            source = %source_prefix,
            archive = %archive_prefix,
            "Import service initialized"
        );
        Self {
            store,
            catalog,
            source_prefix,
            archive_prefix,
            processed: Mutex::new(HashSet::new()),
            last_scan: RwLock::new(None),
        }
    }

    /// Run one scan pass over the source prefix.
    ///
    /// Returns a fresh [`ImportRunResult`]; never propagates per-object
    /// errors. Idempotent per object: archived objects are no longer
    /// listed, and titles already in the catalog archive without
    /// creating anything.
    pub async fn scan_and_import(&self) -> ImportRunResult {
        *self.last_scan.write().await = Some(Utc::now());
        info!("Starting manhwa import scan");

        let objects = match self.store.list(&self.source_prefix, true).await {
            Ok(objects) => objects,
            Err(StorageError::Unavailable(reason)) => {
                warn!(%reason, "Object store not available, skipping import");
                return ImportRunResult::skipped(reason);
            }
            Err(e) => {
                error!(error = %e, "Import scan failed while listing source prefix");
                return ImportRunResult::errored(e.to_string());
            }
        };

        let mut result = ImportRunResult::new();
        for object in objects.iter().filter(|o| o.is_json()) {
            result.scanned += 1;

            if self.processed.lock().await.contains(&object.key) {
                debug!(key = %object.key, "Skipping already processed object");
                continue;
            }

            self.process_object(&object.key, &mut result).await;
        }

        info!(
            scanned = result.scanned,
            imported = result.imported,
            failed = result.failed,
            "Import scan complete"
        );
        result
    }

    /// Handle one source object; records its outcome on `result`.
    async fn process_object(&self, key: &str, result: &mut ImportRunResult) {
        debug!(%key, "Processing object");

        let payload = match self.download_json(key).await {
            Ok(payload) => payload,
            Err(message) => {
                record_failure(result, key, &message);
                return;
            }
        };

        match classifier::classify(&payload, key) {
            Ok(Classification::Metadata) => {
                // Not a content record; archive so it isn't rescanned
                debug!(%key, "Metadata payload, archiving without import");
                self.archive(key).await;
                self.mark_processed(key).await;
            }
            Ok(Classification::Record(record)) => match self.import_record(record).await {
                Ok(ImportOutcome::Created(entry)) => {
                    info!(%key, title = %entry.title, "Imported new manhwa");
                    self.archive(key).await;
                    self.mark_processed(key).await;
                    result.imported += 1;
                    result.imported_titles.push(entry.title);
                }
                Ok(ImportOutcome::Duplicate(entry)) => {
                    info!(%key, title = %entry.title, "Title already cataloged, archiving duplicate");
                    self.archive(key).await;
                    self.mark_processed(key).await;
                }
                Err(e) => record_failure(result, key, &e.to_string()),
            },
            Err(e) => record_failure(result, key, &e.to_string()),
        }
    }

    async fn download_json(&self, key: &str) -> Result<serde_json::Value, String> {
        let bytes = self
            .store
            .get(key)
            .await
            .map_err(|e| format!("Download failed: {}", e))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("JSON parsing failed: {}", e))
    }

    /// Dedupe, persist derived assets, and create the catalog entry.
    async fn import_record(&self, record: ClassifiedRecord) -> Result<ImportOutcome, ImportError> {
        if let Some(existing) = self.catalog.find_by_title(&record.title).await? {
            return Ok(ImportOutcome::Duplicate(existing));
        }

        let cover_image = self.store_cover_image(&record).await?;

        let entry = self
            .catalog
            .create(NewCatalogEntry {
                title: record.title.clone(),
                author: record.author.clone(),
                genre: record.genre.clone(),
                status: "completed".to_string(),
                description: record.description.clone(),
                cover_image,
                generated: true,
                source_file: record.source_object_key.clone(),
                file_type: record.file_type.as_str().to_string(),
                generated_at: Utc::now(),
            })
            .await?;

        self.store_character_art(&record, &entry.id).await?;

        Ok(ImportOutcome::Created(entry))
    }

    /// Decode and persist an embedded cover, returning its public URL.
    ///
    /// The key is derived from a hash of the source object key so
    /// repeated imports of the same object name collide onto the same
    /// cover object instead of accumulating copies.
    async fn store_cover_image(
        &self,
        record: &ClassifiedRecord,
    ) -> Result<Option<String>, ImportError> {
        let Some(encoded) = &record.cover_image_b64 else {
            return Ok(None);
        };

        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Malformed embedded art is not worth failing the
                // whole record over; import without a cover
                warn!(
                    key = %record.source_object_key,
                    error = %e,
                    "Cover art base64 decode failed, importing without cover"
                );
                return Ok(None);
            }
        };

        let hash = Sha256::digest(record.source_object_key.as_bytes());
        let cover_key = format!("covers/generated_{}_cover.png", &hex::encode(hash)[..8]);

        self.store.put(&cover_key, bytes, "image/png").await?;
        Ok(Some(self.store.public_url(&cover_key)))
    }

    /// Decode and persist embedded character art under the new entity id.
    async fn store_character_art(
        &self,
        record: &ClassifiedRecord,
        entity_id: &str,
    ) -> Result<(), ImportError> {
        let Some(encoded) = &record.character_image_b64 else {
            return Ok(());
        };

        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    key = %record.source_object_key,
                    error = %e,
                    "Character art base64 decode failed, skipping"
                );
                return Ok(());
            }
        };

        let art_key = format!("characters/{}_character.png", entity_id);
        self.store.put(&art_key, bytes, "image/png").await?;
        debug!(%art_key, "Stored character art");
        Ok(())
    }

    /// Relocate a handled object to the archive prefix.
    ///
    /// Copy-then-delete; failures are logged but never fail the
    /// object's outcome. A leftover source object is re-detected as a
    /// duplicate on the next scan and archived then.
    async fn archive(&self, key: &str) {
        let archived_key = match key.strip_prefix(&self.source_prefix) {
            Some(suffix) => format!("{}{}", self.archive_prefix, suffix),
            None => {
                warn!(%key, "Object outside source prefix, not archiving");
                return;
            }
        };

        if let Err(e) = self.store.copy(key, &archived_key).await {
            warn!(%key, error = %e, "Archive copy failed, object stays in source prefix");
            return;
        }
        if let Err(e) = self.store.delete(key).await {
            warn!(%key, error = %e, "Source delete failed after archive copy");
            return;
        }
        debug!(from = %key, to = %archived_key, "Archived object");
    }

    async fn mark_processed(&self, key: &str) {
        self.processed.lock().await.insert(key.to_string());
    }

    /// Storage-side statistics for the admin surface.
    pub async fn import_status(&self) -> Result<ImportStatus, StorageError> {
        let generated = self.store.list(&self.source_prefix, true).await?;
        let imported = self.store.list(&self.archive_prefix, true).await?;

        Ok(ImportStatus {
            generated_files: generated.len(),
            imported_files: imported.len(),
            last_scan: *self.last_scan.read().await,
            processed_cache_size: self.processed.lock().await.len(),
        })
    }

    /// JSON key listings for both prefixes (debugging surface).
    pub async fn list_files(&self) -> Result<(Vec<String>, Vec<String>), StorageError> {
        let generated = self
            .store
            .list(&self.source_prefix, true)
            .await?
            .into_iter()
            .filter(|o| o.is_json())
            .map(|o| o.key)
            .collect();
        let imported = self
            .store
            .list(&self.archive_prefix, true)
            .await?
            .into_iter()
            .filter(|o| o.is_json())
            .map(|o| o.key)
            .collect();
        Ok((generated, imported))
    }
}

fn record_failure(result: &mut ImportRunResult, key: &str, message: &str) {
    error!(%key, %message, "Object import failed");
    result.failed += 1;
    result.errors.push(format!("{}: {}", key, message));
}
