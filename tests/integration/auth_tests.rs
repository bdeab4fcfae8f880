//! Authorization gate integration tests.
//!
//! Tests verify:
//! - Valid tokens are accepted on protected routes
//! - Missing, malformed, expired and foreign tokens are rejected with 401
//! - Public routes ignore the token entirely
//! - Signing keys are fetched once and then served from the cache

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::test_utils::{
    body_json, expired_token, mint_token, sample_article, send, test_app, valid_token,
    TEST_AUDIENCE, TEST_DOMAIN, TEST_KID,
};

fn issuer() -> String {
    format!("https://{}/", TEST_DOMAIN)
}

async fn assert_rejected(token: Option<&str>) {
    let app = test_app();

    let response = send(
        &app.router,
        Method::POST,
        "/api/articles",
        token,
        Some(sample_article("Blocked")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "error": { "message": "unable to validate token", "type": "authorization" } })
    );
    assert_eq!(app.documents.len("articles").await, 0);
}

#[tokio::test]
async fn test_valid_token_accepted() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::POST,
        "/api/articles",
        Some(&valid_token()),
        Some(sample_article("Allowed")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_missing_header_rejected() {
    assert_rejected(None).await;
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    assert_rejected(Some("not.a.token")).await;
}

#[tokio::test]
async fn test_expired_token_rejected() {
    assert_rejected(Some(&expired_token())).await;
}

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let token = mint_token("https://someone-else.example.com", &issuer(), TEST_KID);
    assert_rejected(Some(&token)).await;
}

#[tokio::test]
async fn test_wrong_issuer_rejected() {
    let token = mint_token(TEST_AUDIENCE, "https://evil.example.com/", TEST_KID);
    assert_rejected(Some(&token)).await;
}

#[tokio::test]
async fn test_unknown_key_rejected() {
    let token = mint_token(TEST_AUDIENCE, &issuer(), "rotated-away");
    assert_rejected(Some(&token)).await;
}

#[tokio::test]
async fn test_get_by_id_requires_token() {
    let app = test_app();

    let response = send(
        &app.router,
        Method::GET,
        "/api/articles/0123456789abcdef0123456789abcdef",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_routes_ignore_bad_token() {
    let app = test_app();

    let response = send(&app.router, Method::GET, "/api/articles", Some("junk"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app.router, Method::GET, "/api/links", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signing_keys_are_cached() {
    let app = test_app();
    let token = valid_token();

    for title in ["One", "Two", "Three"] {
        let response = send(
            &app.router,
            Method::POST,
            "/api/articles",
            Some(&token),
            Some(sample_article(title)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(app.fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_unknown_key_ids_do_not_refetch() {
    let app = test_app();

    for kid in ["bogus-kid", "bogus-kid", "bogus-kid", "other-kid", "third-kid"] {
        let token = mint_token(TEST_AUDIENCE, &issuer(), kid);
        let response = send(
            &app.router,
            Method::POST,
            "/api/articles",
            Some(&token),
            Some(sample_article("Forged")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(app.fetcher.fetch_count(), 1);

    // the known key arrived with that single fetch
    let response = send(
        &app.router,
        Method::POST,
        "/api/articles",
        Some(&valid_token()),
        Some(sample_article("Genuine")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.fetcher.fetch_count(), 1);
}
