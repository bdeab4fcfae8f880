//! Shared state and helpers for the API handlers.
//!
//! Resource handlers live next to their route tables in `articles`, `links`
//! and `images`; this module holds what they have in common, plus the health
//! check.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{StatusCode, Uri},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use super::dispatch::{empty_response, json_response, HandlerResult};
use super::routes::Route;
use crate::error::{ApiError, Classify, ErrorCategory};
use crate::model::{Article, Document, Link};
use crate::objects::ObjectStore;
use crate::store::{DocumentFilter, DocumentStore, Repository};

/// Largest accepted request body or upload form (1 MiB).
pub const MAX_BODY_SIZE: usize = 1 << 20;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub articles: Repository<Article>,
    pub links: Repository<Link>,
    pub images: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(documents: Arc<dyn DocumentStore>, images: Arc<dyn ObjectStore>) -> Self {
        Self {
            articles: Repository::new(Arc::clone(&documents)),
            links: Repository::new(documents),
            images,
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Read a JSON document from a request body of at most [`MAX_BODY_SIZE`] bytes.
pub async fn read_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    let bytes = to_bytes(body, MAX_BODY_SIZE)
        .await
        .classify("body is invalid", ErrorCategory::FormatError, false)?;
    serde_json::from_slice(&bytes).classify("body is invalid", ErrorCategory::FormatError, false)
}

// =============================================================================
// Document Operations
// =============================================================================

/// `200` with the filtered listing.
pub async fn list_documents<D: Document>(repository: &Repository<D>, uri: &Uri) -> HandlerResult {
    let filter = DocumentFilter::from_query::<D>(uri.query())?;
    let documents = repository.list(&filter).await?;
    json_response(StatusCode::OK, &documents)
}

/// `200` with one document.
pub async fn get_document<D: Document>(repository: &Repository<D>, id: &str) -> HandlerResult {
    let document = repository.get(id).await?;
    json_response(StatusCode::OK, &document)
}

/// `201` with the stored document, including its new id.
pub async fn create_document<D: Document>(repository: &Repository<D>, body: Body) -> HandlerResult {
    let document: D = read_json(body).await?;
    let created = repository.create(document).await?;
    json_response(StatusCode::CREATED, &created)
}

/// `200` with the replaced document.
pub async fn update_document<D: Document>(
    repository: &Repository<D>,
    id: &str,
    body: Body,
) -> HandlerResult {
    let document: D = read_json(body).await?;
    let updated = repository.update(id, document).await?;
    json_response(StatusCode::OK, &updated)
}

/// `200` with an empty body.
pub async fn delete_document<D: Document>(repository: &Repository<D>, id: &str) -> HandlerResult {
    repository.delete(id).await?;
    empty_response(StatusCode::OK)
}

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /health` (HEAD is answered by the same handler without a body).
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn health_routes() -> Vec<Route> {
    vec![
        Route::get("/health", false, health_handler),
        Route::get("/api/health", false, health_handler),
    ]
}
