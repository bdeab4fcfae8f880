//! HTTP server layer for the articles API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         CORS ─ timeout ─ [auth gate] ─ handler ─ dispatch       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │ articles    │  │    auth     │  │        routes           │  │
//! │  │ links       │  │ (JWT, JWKS) │  │  (route table, CORS)    │  │
//! │  │ images      │  └─────────────┘  └─────────────────────────┘  │
//! │  └─────────────┘                                                │
//! │         │              dispatch: errors → status + envelope     │
//! └─────────┼───────────────────────────────────────────────────────┘
//!           ▼
//!    Repository<D> ── DocumentStore        ObjectStore (images)
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

pub mod articles;
pub mod auth;
pub mod dispatch;
pub mod handlers;
pub mod images;
pub mod keys;
pub mod links;
pub mod routes;

pub use auth::{auth_middleware, bearer_token, AuthError, Claims, JwtAuth};
pub use dispatch::{json_response, HandlerError, HandlerResult, JSON_CONTENT_TYPE};
pub use handlers::{health_handler, AppState, HealthResponse, MAX_BODY_SIZE};
pub use keys::{HttpKeySetFetcher, KeyCache, KeySetFetcher, DEFAULT_KEY_TTL};
pub use routes::{build_cors_layer, build_router, create_router, route_table, Route, RouterConfig};

/// Default bound on graceful shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Serve `router` until Ctrl-C, then drain for at most `shutdown_timeout`.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown_timeout: Duration,
) -> io::Result<()> {
    serve_until(listener, router, shutdown_timeout, shutdown_signal()).await
}

/// Serve `router` until `signal` resolves, then drain in-flight requests.
///
/// Connections still open after `shutdown_timeout` are abandoned and the
/// function returns.
pub async fn serve_until<F>(
    listener: TcpListener,
    router: Router,
    shutdown_timeout: Duration,
    signal: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let drain = Arc::new(Notify::new());
    let drain_started = Arc::clone(&drain);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain_started.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => return flatten(result),
        _ = signal => {}
    }

    info!(
        timeout_secs = shutdown_timeout.as_secs(),
        "Shutting down, draining connections"
    );
    drain.notify_one();

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => flatten(result),
        Err(_) => {
            warn!("Graceful shutdown timed out, exiting");
            Ok(())
        }
    }
}

fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
