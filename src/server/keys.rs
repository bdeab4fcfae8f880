//! Signing keys for bearer token verification.
//!
//! The identity provider publishes its public keys as a JSON Web Key Set.
//! Keys are fetched on demand and cached by key id for a fixed TTL. Refreshes
//! of the whole set are serialized and rate limited, so tokens naming an
//! unknown key id cannot force a fetch per request.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use lru::LruCache;
use tokio::sync::{Mutex, MutexGuard};

use super::auth::AuthError;

/// How long a fetched key stays usable (10 minutes).
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(600);

/// Maximum number of cached keys.
pub const DEFAULT_KEY_CAPACITY: usize = 64;

/// Minimum time between two fetches of the key set (30 seconds).
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Key Set Fetching
// =============================================================================

/// Source of the provider's published key set.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set over HTTP.
#[derive(Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// The provider's well-known key set location.
    pub fn for_domain(domain: &str) -> Self {
        Self::new(format!("https://{}/.well-known/jwks.json", domain))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(format!("invalid key set: {}", e)))
    }
}

// =============================================================================
// Key Cache
// =============================================================================

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

/// LRU cache of decoding keys by key id, with a per-entry TTL.
///
/// Lookups refresh recency. The refresh lock holds the time of the last key
/// set fetch; callers take it before fetching so concurrent misses wait for
/// one fetch instead of issuing their own.
pub struct KeyCache {
    entries: Mutex<LruCache<String, CachedKey>>,
    refreshed_at: Mutex<Option<Instant>>,
    ttl: Duration,
    min_refresh_interval: Duration,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(DEFAULT_KEY_CAPACITY, ttl)
    }

    pub fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            refreshed_at: Mutex::new(None),
            ttl,
            min_refresh_interval: ttl.min(DEFAULT_MIN_REFRESH_INTERVAL),
        }
    }

    /// Override the minimum time between key set fetches.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// A fresh key for `kid`, if cached.
    pub async fn get(&self, kid: &str) -> Option<DecodingKey> {
        let mut entries = self.entries.lock().await;
        entries
            .get(kid)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.key.clone())
    }

    pub async fn insert(&self, kid: impl Into<String>, key: DecodingKey) {
        self.entries.lock().await.put(
            kid.into(),
            CachedKey {
                key,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Take the refresh lock. Holds the time of the last key set fetch.
    pub async fn refresh_lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.refreshed_at.lock().await
    }

    /// Whether a fetch at `last` is recent enough to skip another one.
    pub fn refreshed_recently(&self, last: Option<Instant>) -> bool {
        last.is_some_and(|at| at.elapsed() < self.min_refresh_interval)
    }

    /// Number of cached keys, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_TTL)
    }
}
