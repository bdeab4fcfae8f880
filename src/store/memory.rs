use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentFilter, DocumentStore};
use crate::error::StoreError;

type Collection = HashMap<String, Value>;

/// In-process document store.
///
/// Nothing is persisted; documents live as long as the store.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(id) {
            return Err(StoreError::Operation(format!(
                "duplicate id {} in {}",
                id, collection
            )));
        }
        documents.insert(id.to_string(), document);
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        match collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        {
            Some(existing) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some())
    }
}
