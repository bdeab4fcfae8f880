//! Static-site proxy tests.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use articles_api::client::AccessTokenService;
use articles_api::proxy::{create_proxy_router, ProxyState};

use super::test_utils::{
    body_bytes, body_json, create_article, sample_article, send, spawn_server, test_credentials,
};

fn proxy_router(api_url: &str, token_url_base: &str, static_dir: &std::path::Path) -> axum::Router {
    let tokens = Arc::new(AccessTokenService::new(test_credentials(token_url_base)));
    create_proxy_router(
        ProxyState::new(api_url, tokens),
        static_dir,
        Duration::from_secs(5),
        false,
    )
}

#[tokio::test]
async fn test_proxy_injects_token() {
    let (base_url, app) = spawn_server().await;
    let id = create_article(&app.router, sample_article("Proxied")).await;
    let site = tempfile::tempdir().unwrap();
    let router = proxy_router(&base_url, &base_url, site.path());

    // article by id requires a token upstream
    let response = send(
        &router,
        Method::GET,
        &format!("/api/articles/{}", id),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=UTF-8"
    );
    assert_eq!(body_json(response).await["title"], "Proxied");

    let response = send(&router, Method::GET, "/api/articles?tags=rust", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_proxy_relays_upstream_errors() {
    let (base_url, _app) = spawn_server().await;
    let site = tempfile::tempdir().unwrap();
    let router = proxy_router(&base_url, &base_url, site.path());

    let response = send(&router, Method::GET, "/api/articles?content=x", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["type"], "validation-error");
}

#[tokio::test]
async fn test_proxy_rejects_writes() {
    let (base_url, app) = spawn_server().await;
    let site = tempfile::tempdir().unwrap();
    let router = proxy_router(&base_url, &base_url, site.path());

    let response = send(
        &router,
        Method::POST,
        "/api/articles",
        None,
        Some(sample_article("Sneaky")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(app.documents.len("articles").await, 0);

    let response = send(
        &router,
        Method::DELETE,
        "/api/links/0123456789abcdef0123456789abcdef",
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_proxy_serves_static_files() {
    let (base_url, _app) = spawn_server().await;
    let site = tempfile::tempdir().unwrap();
    std::fs::write(site.path().join("index.html"), "<h1>Blog</h1>").unwrap();
    let router = proxy_router(&base_url, &base_url, site.path());

    let response = send(&router, Method::GET, "/index.html", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<h1>Blog</h1>");

    let response = send(&router, Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, Method::GET, "/missing.css", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_proxy_unreachable_upstream() {
    let (base_url, _app) = spawn_server().await;
    let site = tempfile::tempdir().unwrap();
    let router = proxy_router("http://127.0.0.1:1", &base_url, site.path());

    let response = send(&router, Method::GET, "/api/articles", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_proxy_slow_upstream_times_out() {
    let (token_url, _app) = spawn_server().await;
    let slow = axum::Router::new().route(
        "/api/articles",
        axum::routing::get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "[]"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let slow_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, slow).await.unwrap() });

    let site = tempfile::tempdir().unwrap();
    let tokens = Arc::new(AccessTokenService::new(test_credentials(&token_url)));
    let router = create_proxy_router(
        ProxyState::new(&slow_url, tokens),
        site.path(),
        Duration::from_millis(200),
        false,
    );

    let response = send(&router, Method::GET, "/api/articles", None, None).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
