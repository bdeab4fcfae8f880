//! Article API integration tests.
//!
//! Tests verify:
//! - Create, get, replace and delete through the full router
//! - Listing order and query filters
//! - Error envelopes, including hidden bodies for 404
//! - Health checks and method handling

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use super::test_utils::{
    body_bytes, body_json, create_article, sample_article, send, test_app, valid_token,
};

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_article_assigns_id() {
    let app = test_app();
    let token = valid_token();

    let response = send(
        &app.router,
        Method::POST,
        "/api/articles",
        Some(&token),
        Some(sample_article("Hello World")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=UTF-8"
    );

    let body = body_json(response).await;
    let id = body["id"].as_str().unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(body["title"], "Hello World");
    assert!(body.get("publishDate").is_none());
    assert_eq!(app.documents.len("articles").await, 1);
}

#[tokio::test]
async fn test_create_article_with_publish_date() {
    let app = test_app();
    let mut article = sample_article("Dated");
    article["publishDate"] = json!("2021-03-04T10:00:00Z");

    let id = create_article(&app.router, article).await;
    let response = send(
        &app.router,
        Method::GET,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["publishDate"], "2021-03-04");
}

#[tokio::test]
async fn test_create_article_missing_fields() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::POST,
        "/api/articles",
        Some(&valid_token()),
        Some(json!({ "title": "Only a title" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "validation-error");
    let detail = body["error"]["message-detail"].as_str().unwrap();
    assert!(detail.contains("author is required"));
    assert!(detail.contains("content is required"));
    assert!(!detail.contains("title"));
    assert_eq!(app.documents.len("articles").await, 0);
}

#[tokio::test]
async fn test_create_article_invalid_json() {
    let app = test_app();

    let response = axum_raw_post(&app.router, "/api/articles", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "format-error");
    assert_eq!(body["error"]["message"], "body is invalid");
}

async fn axum_raw_post(
    router: &axum::Router,
    uri: &str,
    body: &'static str,
) -> axum::http::Response<axum::body::Body> {
    use tower::ServiceExt;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", valid_token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

// =============================================================================
// Get / Replace / Delete
// =============================================================================

#[tokio::test]
async fn test_get_invalid_id_is_hidden_404() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::GET,
        "/api/articles/not-an-id",
        Some(&valid_token()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_get_missing_article_is_404() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::GET,
        "/api/articles/0123456789abcdef0123456789abcdef",
        Some(&valid_token()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_replace_article() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Before")).await;

    let mut updated = sample_article("After");
    updated["id"] = json!(id);
    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        Some(updated),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "After");

    let response = send(
        &app.router,
        Method::GET,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        None,
    )
    .await;
    assert_eq!(body_json(response).await["title"], "After");
}

#[tokio::test]
async fn test_replace_with_mismatched_id() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Original")).await;

    let mut updated = sample_article("Changed");
    updated["id"] = json!("ffffffffffffffffffffffffffffffff");
    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        Some(updated),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["type"], "validation-error");
}

#[tokio::test]
async fn test_replace_without_body_id_is_rejected() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Original")).await;

    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        Some(sample_article("Changed")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_replace_missing_article() {
    let app = test_app();
    let id = "0123456789abcdef0123456789abcdef";

    let mut article = sample_article("Ghost");
    article["id"] = json!(id);
    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/articles/{}", id),
        Some(&valid_token()),
        Some(article),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_article() {
    let app = test_app();
    let id = create_article(&app.router, sample_article("Doomed")).await;
    let path = format!("/api/articles/{}", id);

    let response = send(&app.router, Method::DELETE, &path, Some(&valid_token()), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());

    let response = send(&app.router, Method::DELETE, &path, Some(&valid_token()), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_is_public_and_newest_first() {
    let app = test_app();
    for (title, date) in [
        ("Old", "2019-01-01"),
        ("New", "2022-06-01"),
        ("Middle", "2020-05-05"),
    ] {
        let mut article = sample_article(title);
        article["publishDate"] = json!(date);
        create_article(&app.router, article).await;
    }

    let response = send(&app.router, Method::GET, "/api/articles", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["New", "Middle", "Old"]);
}

#[tokio::test]
async fn test_list_empty_collection() {
    let app = test_app();

    let response = send(&app.router, Method::GET, "/api/articles", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_list_filters() {
    let app = test_app();

    let mut rust = sample_article("Rust");
    rust["tags"] = json!(["rust", "systems"]);
    rust["author"] = json!("Ferris");
    create_article(&app.router, rust).await;

    let mut go = sample_article("Go");
    go["tags"] = json!(["go"]);
    create_article(&app.router, go).await;

    let mut web = sample_article("Web");
    web["tags"] = json!(["javascript"]);
    create_article(&app.router, web).await;

    let titles = |body: serde_json::Value| -> Vec<String> {
        let mut titles: Vec<String> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap().to_string())
            .collect();
        titles.sort();
        titles
    };

    let response = send(
        &app.router,
        Method::GET,
        "/api/articles?tags=rust&tags=go",
        None,
        None,
    )
    .await;
    assert_eq!(titles(body_json(response).await), vec!["Go", "Rust"]);

    let response = send(
        &app.router,
        Method::GET,
        "/api/articles?tags=rust&tags=go&author=Ferris",
        None,
        None,
    )
    .await;
    assert_eq!(titles(body_json(response).await), vec!["Rust"]);
}

#[tokio::test]
async fn test_list_unknown_filter_rejected() {
    let app = test_app();

    let response = send(&app.router, Method::GET, "/api/articles?content=x", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["type"], "validation-error");
}

// =============================================================================
// Health and Methods
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    for path in ["/health", "/api/health"] {
        let response = send(&app.router, Method::GET, path, None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }
}

#[tokio::test]
async fn test_health_head_and_post() {
    let app = test_app();

    let response = send(&app.router, Method::HEAD, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app.router, Method::POST, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app();

    let response = send(&app.router, Method::GET, "/api/unknown", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight() {
    use tower::ServiceExt;

    let app = test_app();
    let request = axum::http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/articles")
        .header(header::ORIGIN, "https://blog.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
