//! Manhwa catalog service
//!
//! The catalog holds one record per comic title. The import pipeline
//! consumes it through a narrow interface: existence-by-title lookup
//! and create. No update or delete is needed on this path.

pub mod sqlite;

pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog access errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog record malformed: {0}")]
    Malformed(String),
}

/// Persisted catalog record for one manhwa
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: Vec<String>,
    /// Publication status; generated titles are always "completed"
    pub status: String,
    pub description: String,
    pub cover_image: Option<String>,
    /// Marks AI-generated entries imported by this service
    pub generated: bool,
    /// Object key the entry was imported from
    pub source_file: String,
    /// Source payload shape ("complete", "traditional", "story")
    pub file_type: String,
    pub generated_at: DateTime<Utc>,
}

/// Fields for a new catalog entry; the catalog assigns the id
#[derive(Debug, Clone)]
pub struct NewCatalogEntry {
    pub title: String,
    pub author: String,
    pub genre: Vec<String>,
    pub status: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub generated: bool,
    pub source_file: String,
    pub file_type: String,
    pub generated_at: DateTime<Utc>,
}

/// Narrow catalog interface consumed by the import pipeline
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Case-insensitive lookup by title.
    async fn find_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Create a new entry and return it with its assigned id.
    async fn create(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError>;

    /// Number of catalog entries (admin/introspection surface).
    async fn count(&self) -> Result<u64, CatalogError>;
}
