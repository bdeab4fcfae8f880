//! Document storage.
//!
//! This module provides the persistence layer for articles and links:
//!
//! - [`DocumentStore`]: object-safe trait over JSON documents grouped in
//!   named collections
//! - [`MemoryStore`]: process-local store for development and tests
//! - [`DynamoStore`]: DynamoDB-backed store
//! - [`Repository`]: typed layer used by the HTTP handlers, which classifies
//!   store failures and enforces document invariants
//! - [`DocumentFilter`]: listing filter built from a query string

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

mod dynamodb;
mod filter;
mod memory;
mod repository;

pub use dynamodb::{create_dynamodb_client, DynamoStore};
pub use filter::{DocumentFilter, FilterClause};
pub use memory::MemoryStore;
pub use repository::{parse_id, Repository};

/// A store of JSON documents keyed by string id within named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection matching `filter`, in no particular order.
    async fn find(&self, collection: &str, filter: &DocumentFilter)
        -> Result<Vec<Value>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Replace an existing document. Returns `false` when there is none.
    async fn replace(&self, collection: &str, id: &str, document: Value)
        -> Result<bool, StoreError>;

    /// Remove a document. Returns `false` when there is none.
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Check that the backing store is reachable and the collection exists.
    async fn check(&self, _collection: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
