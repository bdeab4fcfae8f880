//! Article image integration tests.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, create_article, sample_article, send, test_app, valid_token,
};

const BOUNDARY: &str = "articles-test-boundary";

/// A multipart body with one file part per `(field, filename, content_type, data)`.
fn multipart_body(parts: &[(&str, Option<&str>, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match filename {
            Some(name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(
    router: &axum::Router,
    article_id: &str,
    token: Option<&str>,
    body: Vec<u8>,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/articles/{}/images", article_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    router
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_download_delete() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Pictures")).await;

    let body = multipart_body(&[
        ("image", Some("banner.png"), "image/png", b"\x89PNG fake"),
        ("caption", None, "text/plain", b"not a file"),
        ("image", Some("photo.jpg"), "image/jpeg", b"\xFF\xD8 fake"),
    ]);
    let response = upload(&app.router, &id, Some(&valid_token()), body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        app.images.paths().await,
        vec![format!("{}/banner.png", id), format!("{}/photo.jpg", id)]
    );

    let path = format!("/api/articles/{}/images/banner.png", id);
    let response = send(&app.router, Method::GET, &path, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"banner.png\""
    );
    assert_eq!(body_bytes(response).await, b"\x89PNG fake");

    let response = send(&app.router, Method::DELETE, &path, Some(&valid_token()), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app.router, Method::GET, &path, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_upload_strips_directories_from_filename() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Paths")).await;

    let body = multipart_body(&[("image", Some("../../secret.png"), "image/png", b"x")]);
    let response = upload(&app.router, &id, Some(&valid_token()), body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(app.images.paths().await, vec![format!("{}/secret.png", id)]);
}

#[tokio::test]
async fn test_upload_to_missing_article() {
    let app = test_app();

    let body = multipart_body(&[("image", Some("a.png"), "image/png", b"x")]);
    let response = upload(
        &app.router,
        "0123456789abcdef0123456789abcdef",
        Some(&valid_token()),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.images.paths().await.is_empty());
}

#[tokio::test]
async fn test_upload_requires_token() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Locked")).await;

    let body = multipart_body(&[("image", Some("a.png"), "image/png", b"x")]);
    let response = upload(&app.router, &id, None, body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_multipart_is_format_error() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Plain")).await;

    let response = send(
        &app.router,
        Method::POST,
        &format!("/api/articles/{}/images", id),
        Some(&valid_token()),
        Some(serde_json::json!({ "image": "nope" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_image() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::DELETE,
        "/api/articles/0123456789abcdef0123456789abcdef/images/none.png",
        Some(&valid_token()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_id_spellings_share_storage() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Spelling")).await;
    let hyphenated = format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    );

    let body = multipart_body(&[("image", Some("banner.png"), "image/png", b"x")]);
    let response = upload(&app.router, &hyphenated, Some(&valid_token()), body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(app.images.paths().await, vec![format!("{}/banner.png", id)]);

    let upper = format!("/api/articles/{}/images/banner.png", id.to_uppercase());
    let response = send(&app.router, Method::GET, &upper, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"x");

    let plain = format!("/api/articles/{}/images/banner.png", id);
    let response = send(&app.router, Method::DELETE, &plain, Some(&valid_token()), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.images.paths().await.is_empty());
}
