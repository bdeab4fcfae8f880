//! Binary object storage for article images.
//!
//! Objects are addressed by a slash-separated path; images live under
//! `<articleId>/<filename>`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::ObjectStoreError;

mod s3;

pub use s3::{create_s3_client, S3ObjectStore};

/// Content type used when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored object and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Blob storage keyed by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;

    /// Fetch an object. Missing objects are [`ObjectStoreError::NotFound`].
    async fn get(&self, path: &str) -> Result<StoredObject, ObjectStoreError>;

    /// Delete an object. Missing objects are [`ObjectStoreError::NotFound`].
    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;

    /// Check that the backing store is reachable.
    async fn check(&self) -> Result<(), ObjectStoreError> {
        Ok(())
    }
}

/// In-process object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<StoredObject, ObjectStoreError> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        self.objects
            .write()
            .await
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))
    }
}
