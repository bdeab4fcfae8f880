//! Static site server with a token-injecting API proxy.
//!
//! ```text
//! GET /api/*   → <api-url>/api/* with `Authorization: Bearer <token>`
//! other /api/* → 405
//! /*           → files from the static directory
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::client::AccessTokenService;

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream: String,
    tokens: Arc<AccessTokenService>,
}

impl ProxyState {
    pub fn new(upstream: impl Into<String>, tokens: Arc<AccessTokenService>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream: upstream.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn target(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
        format!("{}{}", self.upstream, path_and_query)
    }
}

/// Build the proxy router.
pub fn create_proxy_router(
    state: ProxyState,
    static_dir: &Path,
    request_timeout: Duration,
    enable_tracing: bool,
) -> Router {
    let router = Router::new()
        .route("/api/{*rest}", any(forward))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    if enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

async fn forward(State(state): State<ProxyState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let token = match state.tokens.access_token().await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Unable to obtain access token");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let target = state.target(&uri);
    debug!(target = %target, "Forwarding request");

    let upstream = match state.client.get(&target).bearer_auth(token).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(target = %target, error = %e, "Upstream request failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!(target = %target, error = %e, "Failed to read upstream body");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}
