//! Router configuration for the articles API.
//!
//! The route table is a plain list of [`Route`] entries collected from each
//! resource module. Entries flagged `require_auth` are wrapped in the bearer
//! token gate; the others are served as-is.
//!
//! # Route Structure
//!
//! ```text
//! /health, /api/health                         - Health check (public)
//! /api/articles                                - List (public), create
//! /api/articles/{id}                           - Get, replace, delete
//! /api/articles/{id}/images                    - Upload
//! /api/articles/{id}/images/{filename}         - Download (public), delete
//! /api/links                                   - List (public), create
//! /api/links/{id}                              - Delete
//! ```

use std::time::Duration;

use axum::{
    handler::Handler,
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    routing::{self, MethodRouter},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::articles::article_routes;
use super::auth::{auth_middleware, JwtAuth};
use super::handlers::{health_routes, AppState};
use super::images::image_routes;
use super::links::link_routes;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// Route Table
// =============================================================================

/// One entry of the route table.
pub struct Route {
    pub method: Method,
    pub path: &'static str,
    pub require_auth: bool,
    pub handler: MethodRouter<AppState>,
}

impl Route {
    fn new(
        method: Method,
        path: &'static str,
        require_auth: bool,
        handler: MethodRouter<AppState>,
    ) -> Self {
        Self {
            method,
            path,
            require_auth,
            handler,
        }
    }

    pub fn get<H, T>(path: &'static str, require_auth: bool, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::GET, path, require_auth, routing::get(handler))
    }

    pub fn post<H, T>(path: &'static str, require_auth: bool, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::POST, path, require_auth, routing::post(handler))
    }

    pub fn put<H, T>(path: &'static str, require_auth: bool, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::PUT, path, require_auth, routing::put(handler))
    }

    pub fn delete<H, T>(path: &'static str, require_auth: bool, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::new(Method::DELETE, path, require_auth, routing::delete(handler))
    }

    /// Transform the handler, e.g. to add a per-route layer.
    pub fn map_handler(
        mut self,
        f: impl FnOnce(MethodRouter<AppState>) -> MethodRouter<AppState>,
    ) -> Self {
        self.handler = f(self.handler);
        self
    }
}

/// Every route the API serves.
pub fn route_table() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(article_routes());
    routes.extend(image_routes());
    routes.extend(link_routes());
    routes.extend(health_routes());
    routes
}

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Token verification; `None` leaves every route public
    pub auth: Option<JwtAuth>,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Requests running longer than this get `408 Request Timeout`
    pub request_timeout: Duration,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Router configuration verifying tokens with `auth`.
    pub fn new(auth: JwtAuth) -> Self {
        Self {
            auth: Some(auth),
            cors_origins: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    ///
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            auth: None,
            cors_origins: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the API router from the full route table.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    build_router(route_table(), state, config)
}

/// Assemble a router from `routes`.
///
/// Routes sharing a path are merged into one method router, so a public
/// `GET` and an authenticated `POST` can live on the same path.
pub fn build_router(routes: Vec<Route>, state: AppState, config: RouterConfig) -> Router {
    if config.auth.is_none() {
        warn!("Authentication disabled: all routes are public");
    }

    let mut router = Router::new();
    for route in routes {
        debug!(
            method = %route.method,
            path = route.path,
            require_auth = route.require_auth,
            "Registering route"
        );

        let handler = match (&config.auth, route.require_auth) {
            (Some(auth), true) => route
                .handler
                .route_layer(middleware::from_fn_with_state(auth.clone(), auth_middleware)),
            _ => route.handler,
        };
        router = router.route(route.path, handler);
    }

    let cors = build_cors_layer(config.cors_origins.as_deref());
    let router = router
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer. Preflight `OPTIONS` requests are answered here.
pub fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match origins {
        None => cors.allow_origin(Any),
        Some([]) => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
