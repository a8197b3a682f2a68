//! In-memory object store
//!
//! Backs tests and credential-less local runs. Keys are held in a
//! sorted map so listings come back in lexicographic order, matching
//! the behavior of a real bucket listing.

use super::{ObjectInfo, ObjectStore, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// Object store held entirely in process memory
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    /// Flipped off to simulate an unreachable store
    available: AtomicBool,
    /// Base used for public URL derivation
    public_base: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            public_base: "memory://bucket".to_string(),
        }
    }

    /// Simulate the store going down (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable(
                "memory store marked unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>, StorageError> {
        self.check_available()?;
        let objects = self.objects.read().await;
        let mut found = Vec::new();
        for (key, obj) in objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if !recursive && key[prefix.len()..].contains('/') {
                continue;
            }
            found.push(ObjectInfo {
                key: key.clone(),
                size: obj.data.len() as u64,
            });
        }
        Ok(found)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.check_available()?;
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut objects = self.objects.write().await;
        let src = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(src_key.to_string()))?;
        objects.insert(dst_key.to_string(), src);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.check_available()?;
        Ok(self.objects.read().await.contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
