//! Bearer token authentication for the articles API.
//!
//! Write routes (and single-document reads) require an RS256 JWT issued by the
//! configured identity provider.
//!
//! # Verification
//!
//! ```text
//! Authorization: Bearer <token>
//!   -> header kid -> signing key (cached, else fetched from the key set)
//!   -> signature, exp, aud == <audience>, iss == https://<domain>/
//!   -> wrapped handler
//! ```
//!
//! Any failure short-circuits with `401 Unauthorized` and the error envelope
//! `{"error":{"message":"unable to validate token","type":"authorization"}}`.
//! The request reaching the handler is the original one, untouched.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::post, Router};
//! use articles_api::server::auth::{auth_middleware, JwtAuth};
//!
//! let auth = JwtAuth::new("example.auth0.com", "https://api.example.com");
//! let app = Router::new()
//!     .route("/api/articles", post(create_article))
//!     .route_layer(middleware::from_fn_with_state(auth, auth_middleware));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::dispatch::JSON_CONTENT_TYPE;
use super::keys::{HttpKeySetFetcher, KeyCache, KeySetFetcher, DEFAULT_KEY_TTL};
use crate::error::{ApiError, ErrorCategory};

// =============================================================================
// Types
// =============================================================================

/// Reasons a request is rejected by the gate.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    /// Token header has no key id, or the key set has no such key
    #[error("No signing key for key id {0:?}")]
    UnknownKey(String),

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Token expired")]
    Expired,

    /// Bad signature, wrong audience or issuer, or an undecodable token
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::Expired => "token_expired",
            AuthError::InvalidToken(_) => "invalid_token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;

        // Forged or misdirected tokens are worth a warning; the rest is routine
        match &self {
            AuthError::InvalidToken(_)
            | AuthError::UnknownKey(_)
            | AuthError::KeySetUnavailable(_) => {
                warn!(
                    error_type = self.error_type(),
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    self
                );
            }
            _ => {
                debug!(
                    error_type = self.error_type(),
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    self
                );
            }
        }

        let err = ApiError::new(
            ErrorCategory::Authorization,
            "unable to validate token",
            &self,
            true,
        );
        match serde_json::to_vec(&err) {
            Ok(body) => (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], Body::from(body))
                .into_response(),
            Err(_) => status.into_response(),
        }
    }
}

/// Claims the gate reads from a verified token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,

    pub exp: u64,
}

// =============================================================================
// JWT Authentication
// =============================================================================

/// Verifies bearer tokens against an identity provider.
#[derive(Clone)]
pub struct JwtAuth {
    domain: String,
    audience: String,
    fetcher: Arc<dyn KeySetFetcher>,
    keys: Arc<KeyCache>,
}

impl JwtAuth {
    /// Authenticator fetching keys from `https://<domain>/.well-known/jwks.json`.
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        let domain = normalize_domain(&domain.into());
        let fetcher = Arc::new(HttpKeySetFetcher::for_domain(&domain));
        Self::with_fetcher(domain, audience, fetcher)
    }

    /// Authenticator with a custom key set source.
    pub fn with_fetcher(
        domain: impl Into<String>,
        audience: impl Into<String>,
        fetcher: Arc<dyn KeySetFetcher>,
    ) -> Self {
        Self {
            domain: normalize_domain(&domain.into()),
            audience: audience.into(),
            fetcher,
            keys: Arc::new(KeyCache::new(DEFAULT_KEY_TTL)),
        }
    }

    /// Set how long fetched keys are trusted.
    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.keys = Arc::new(KeyCache::new(ttl));
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Verify a raw token and return its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header.kid.ok_or_else(|| AuthError::UnknownKey(String::new()))?;
        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer()]);

        let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
        Ok(data.claims)
    }

    /// Key for `kid`, refreshing the cache from the key set on a miss.
    ///
    /// The key set is fetched at most once per refresh interval. A key id
    /// still unknown after a recent fetch is rejected without another one.
    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }

        let mut refreshed_at = self.keys.refresh_lock().await;
        // another request may have fetched while this one waited
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }
        if self.keys.refreshed_recently(*refreshed_at) {
            debug!(kid = kid, "Unknown key id, key set fetched recently");
            return Err(AuthError::UnknownKey(kid.to_string()));
        }

        *refreshed_at = Some(Instant::now());
        let set = self.fetcher.fetch().await?;
        let mut found = None;
        for jwk in &set.keys {
            let Some(id) = jwk.common.key_id.as_deref() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    if id == kid {
                        found = Some(key.clone());
                    }
                    self.keys.insert(id, key).await;
                }
                Err(e) => debug!(kid = id, "Skipping unusable key: {}", e),
            }
        }
        debug!(keys = set.keys.len(), "Fetched signing key set");

        found.ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}

/// `https://example.auth0.com/` and `example.auth0.com` name the same domain.
fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware that only lets requests with a valid bearer token through.
pub async fn auth_middleware(
    State(auth): State<JwtAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;
    let claims = auth.verify(token).await?;
    debug!(
        subject = claims.sub.as_deref().unwrap_or("-"),
        path = %request.uri().path(),
        "Request authorized"
    );
    Ok(next.run(request).await)
}
