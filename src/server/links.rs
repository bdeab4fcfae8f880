//! Link endpoints: public listing, authenticated create and delete.

use axum::{
    body::Body,
    extract::{Path, State},
    http::Uri,
};

use super::dispatch::HandlerResult;
use super::handlers::{create_document, delete_document, list_documents, AppState};
use super::routes::Route;

pub async fn list_links(State(state): State<AppState>, uri: Uri) -> HandlerResult {
    list_documents(&state.links, &uri).await
}

pub async fn create_link(State(state): State<AppState>, body: Body) -> HandlerResult {
    create_document(&state.links, body).await
}

pub async fn delete_link(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    delete_document(&state.links, &id).await
}

pub fn link_routes() -> Vec<Route> {
    vec![
        Route::get("/api/links", false, list_links),
        Route::post("/api/links", true, create_link),
        Route::delete("/api/links/{id}", true, delete_link),
    ]
}
