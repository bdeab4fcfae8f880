//! Typed access to one collection.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{DocumentFilter, DocumentStore};
use crate::error::{ApiError, Classify, ErrorCategory, StoreError};
use crate::model::{Document, DocumentId};

/// Repository for documents of type `D`.
///
/// Converts between typed documents and the store's JSON form, classifies
/// every store failure, and keeps listings in newest-first order.
pub struct Repository<D> {
    store: Arc<dyn DocumentStore>,
    _document: PhantomData<fn() -> D>,
}

impl<D> Clone for Repository<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _document: PhantomData,
        }
    }
}

impl<D: Document> Repository<D> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _document: PhantomData,
        }
    }

    /// Documents matching `filter`, newest first.
    pub async fn list(&self, filter: &DocumentFilter) -> Result<Vec<D>, ApiError> {
        let raw = self
            .store
            .find(D::COLLECTION, filter)
            .await
            .map_err(|e| store_failure(e, "error retrieving data"))?;

        let mut documents = raw
            .into_iter()
            .map(decode::<D>)
            .collect::<Result<Vec<_>, _>>()?;
        documents.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(documents)
    }

    pub async fn get(&self, id: &str) -> Result<D, ApiError> {
        let id = parse_id(id)?;
        match self.fetch(&id).await? {
            Some(document) => decode(document),
            None => Err(absent::<D>()),
        }
    }

    /// Store a new document under a freshly generated id.
    pub async fn create(&self, mut document: D) -> Result<D, ApiError> {
        validate(&document)?;

        let id = DocumentId::generate().to_string();
        document.set_id(Some(id.clone()));
        document.prepare_create();

        self.store
            .insert(D::COLLECTION, &id, encode(&document)?)
            .await
            .map_err(|e| store_failure(e, &format!("failed to create {}", D::NAME)))?;

        debug!(collection = D::COLLECTION, id = %id, "Created document");
        Ok(document)
    }

    /// Replace the document stored under `id`.
    ///
    /// The document's own id, if any, must equal `id`.
    pub async fn update(&self, id: &str, mut document: D) -> Result<D, ApiError> {
        if document.id() != Some(id) {
            return Err(ApiError::validation(
                "id does not match",
                format!(
                    "body id {:?} does not match path id {:?}",
                    document.id().unwrap_or_default(),
                    id
                ),
            ));
        }
        validate(&document)?;

        let parsed = parse_id(id)?;
        let existing = self.fetch(&parsed).await?.ok_or_else(absent::<D>)?;
        let existing: D = decode(existing)?;

        document.set_id(Some(parsed.to_string()));
        document.prepare_update(&existing);
        let stored = encode(&document)?;

        let replaced = self
            .store
            .replace(D::COLLECTION, &parsed.to_string(), stored)
            .await
            .map_err(|e| store_failure(e, &format!("failed to update {}", D::NAME)))?;
        if !replaced {
            return Err(absent::<D>());
        }

        debug!(collection = D::COLLECTION, id = %parsed, "Updated document");
        Ok(document)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let parsed = parse_id(id)?;
        let removed = self
            .store
            .remove(D::COLLECTION, &parsed.to_string())
            .await
            .map_err(|e| store_failure(e, &format!("failed to delete {}", D::NAME)))?;
        if !removed {
            return Err(absent::<D>());
        }

        debug!(collection = D::COLLECTION, id = %parsed, "Deleted document");
        Ok(())
    }

    /// Succeeds when a document with `id` exists.
    pub async fn ensure_exists(&self, id: &str) -> Result<DocumentId, ApiError> {
        let parsed = parse_id(id)?;
        match self.fetch(&parsed).await? {
            Some(_) => Ok(parsed),
            None => Err(absent::<D>()),
        }
    }

    /// Verify the backing collection is reachable.
    pub async fn check(&self) -> Result<(), StoreError> {
        self.store.check(D::COLLECTION).await
    }

    async fn fetch(&self, id: &DocumentId) -> Result<Option<Value>, ApiError> {
        self.store
            .find_by_id(D::COLLECTION, &id.to_string())
            .await
            .map_err(|e| store_failure(e, &format!("could not find {}", D::NAME)))
    }
}

/// Parse a path id. Any spelling of the UUID is accepted; a malformed id is
/// reported as not found.
pub fn parse_id(id: &str) -> Result<DocumentId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::not_found("can not find record: invalid id", "invalid id"))
}

fn absent<D: Document>() -> ApiError {
    let message = format!("{} does not exist", D::NAME);
    ApiError::not_found(message.clone(), message)
}

fn validate<D: Document>(document: &D) -> Result<(), ApiError> {
    let missing = document.missing_fields();
    if missing.is_empty() {
        return Ok(());
    }
    let detail = missing
        .iter()
        .map(|field| format!("{} is required", field))
        .collect::<Vec<_>>()
        .join(", ");
    Err(ApiError::validation("required fields are missing", detail))
}

/// Store failures never expose the store's own error text.
fn store_failure(err: StoreError, message: &str) -> ApiError {
    match err {
        StoreError::Connection(_) => ApiError::new(
            ErrorCategory::DatabaseConnection,
            "failed to establish connection to database",
            err,
            true,
        ),
        StoreError::Operation(_) | StoreError::Serialization(_) => {
            ApiError::new(ErrorCategory::DatabaseError, message, err, true)
        }
    }
}

fn encode<D: Document>(document: &D) -> Result<Value, ApiError> {
    serde_json::to_value(document).classify(
        &format!("failed to encode {}", D::NAME),
        ErrorCategory::DatabaseError,
        true,
    )
}

fn decode<D: Document>(value: Value) -> Result<D, ApiError> {
    serde_json::from_value(value).classify(
        &format!("stored {} is unreadable", D::NAME),
        ErrorCategory::DatabaseError,
        true,
    )
}
