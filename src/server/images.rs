//! Article image endpoints.
//!
//! Images are stored in the object store at `<articleId>/<filename>`.
//!
//! - `GET    /api/articles/{id}/images/{filename}` - download (public)
//! - `POST   /api/articles/{id}/images`            - multipart upload, `202`
//! - `DELETE /api/articles/{id}/images/{filename}` - delete

use axum::{
    body::Body,
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, Path, State,
    },
    http::{header, StatusCode},
    response::Response,
};
use tracing::debug;

use super::dispatch::{empty_response, HandlerResult};
use super::handlers::{AppState, MAX_BODY_SIZE};
use super::routes::Route;
use crate::error::{ApiError, ErrorCategory, ObjectStoreError};
use crate::model::DocumentId;
use crate::objects::DEFAULT_CONTENT_TYPE;
use crate::store::parse_id;

/// Category for object store failures; maps to 500.
pub const STORAGE_ERROR: &str = "storage-error";

/// Object path of an article image, keyed by the canonical article id.
pub fn image_path(article_id: &DocumentId, filename: &str) -> String {
    format!("{}/{}", article_id, filename)
}

fn storage_failure(err: ObjectStoreError) -> ApiError {
    match err {
        ObjectStoreError::NotFound(_) => ApiError::new(
            ErrorCategory::NotFound,
            "image does not exist",
            err,
            true,
        ),
        ObjectStoreError::Storage(_) | ObjectStoreError::Connection(_) => {
            ApiError::new(STORAGE_ERROR, "image storage failed", err, true)
        }
    }
}

fn form_error(detail: String) -> ApiError {
    ApiError::format("form is invalid", detail)
}

/// Last path component of an uploaded file name.
fn clean_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

pub async fn upload_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult {
    let mut multipart = multipart.map_err(|e| form_error(e.body_text()))?;
    let id = state.articles.ensure_exists(&id).await?;

    let mut stored = 0usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e.body_text()))?
    {
        // plain form values carry no file
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let filename = clean_filename(&raw_name).ok_or_else(|| {
            ApiError::validation("invalid file name", format!("{:?}", raw_name))
        })?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await.map_err(|e| form_error(e.body_text()))?;

        let path = image_path(&id, &filename);
        state
            .images
            .put(&path, data, &content_type)
            .await
            .map_err(storage_failure)?;
        debug!(path = %path, content_type = %content_type, "Stored image");
        stored += 1;
    }

    debug!(article = %id, count = stored, "Image upload complete");
    empty_response(StatusCode::ACCEPTED)
}

pub async fn get_image(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    let object = state
        .images
        .get(&image_path(&id, &filename))
        .await
        .map_err(storage_failure)?;

    let disposition_name: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, object.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", disposition_name),
        )
        .body(Body::from(object.data))?)
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .images
        .delete(&image_path(&id, &filename))
        .await
        .map_err(storage_failure)?;
    empty_response(StatusCode::OK)
}

pub fn image_routes() -> Vec<Route> {
    vec![
        Route::get("/api/articles/{id}/images/{filename}", false, get_image),
        Route::post("/api/articles/{id}/images", true, upload_images)
            .map_handler(|handler| handler.layer(DefaultBodyLimit::max(MAX_BODY_SIZE))),
        Route::delete("/api/articles/{id}/images/{filename}", true, delete_image),
    ]
}
