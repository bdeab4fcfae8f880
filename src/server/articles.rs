//! Article endpoints.
//!
//! - `GET    /api/articles`       - list, filtered by query parameters (public)
//! - `GET    /api/articles/{id}`  - one article
//! - `POST   /api/articles`       - create
//! - `PUT    /api/articles/{id}`  - replace; body id must equal `{id}`
//! - `DELETE /api/articles/{id}`  - delete

use axum::{
    body::Body,
    extract::{Path, State},
    http::Uri,
};

use super::dispatch::HandlerResult;
use super::handlers::{
    create_document, delete_document, get_document, list_documents, update_document, AppState,
};
use super::routes::Route;

pub async fn list_articles(State(state): State<AppState>, uri: Uri) -> HandlerResult {
    list_documents(&state.articles, &uri).await
}

pub async fn get_article(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    get_document(&state.articles, &id).await
}

pub async fn create_article(State(state): State<AppState>, body: Body) -> HandlerResult {
    create_document(&state.articles, body).await
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Body,
) -> HandlerResult {
    update_document(&state.articles, &id, body).await
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    delete_document(&state.articles, &id).await
}

pub fn article_routes() -> Vec<Route> {
    vec![
        Route::get("/api/articles", false, list_articles),
        Route::get("/api/articles/{id}", true, get_article),
        Route::post("/api/articles", true, create_article),
        Route::put("/api/articles/{id}", true, update_article),
        Route::delete("/api/articles/{id}", true, delete_article),
    ]
}
