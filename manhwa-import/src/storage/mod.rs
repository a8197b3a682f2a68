//! Object store gateway
//!
//! The platform keeps generated assets in an S3-compatible bucket
//! (MinIO in deployment). The import pipeline only needs a narrow
//! slice of the S3 surface, captured by the [`ObjectStore`] trait:
//! list under a prefix, get/put/copy/delete single objects.
//!
//! Two implementations exist: [`S3ObjectStore`] for real deployments
//! and [`MemoryObjectStore`] for tests and local development.

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use thiserror::Error;

/// Object store gateway errors
///
/// `Unavailable` means the service itself cannot be reached; the
/// pipeline short-circuits a whole scan on it. Everything else is a
/// per-object condition.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object store service cannot be reached at all
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The store rejected the request (auth, malformed key, ...)
    #[error("Object store rejected request for {key}: {message}")]
    Rejected { key: String, message: String },

    /// Response could not be interpreted
    #[error("Invalid object store response: {0}")]
    InvalidResponse(String),
}

/// Listing entry for one stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key, prefix included
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

impl ObjectInfo {
    /// Whether the key carries a `.json` suffix (the only payloads the
    /// import pipeline parses)
    pub fn is_json(&self) -> bool {
        self.key.ends_with(".json")
    }
}

/// Narrow object store interface consumed by the import pipeline
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects under a key prefix.
    ///
    /// With `recursive` set, nested "folders" are traversed; otherwise
    /// only direct children of the prefix are returned.
    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Download a whole object.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object, overwriting any existing one.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Server-side copy within the bucket.
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Existence check without downloading.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL under which a stored object can be fetched by
    /// browsers (used for cover image references in the catalog).
    fn public_url(&self, key: &str) -> String;
}
