//! Client-credentials access tokens.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ClientError;

/// Lifetime assumed when the token endpoint does not report `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Credentials for the client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Token endpoint
    pub auth_url: String,
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Fetches and caches an access token.
///
/// The token is reused until its reported lifetime elapses; concurrent
/// callers wait on the same refresh.
pub struct AccessTokenService {
    client: reqwest::Client,
    credentials: ClientCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenService {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), credentials)
    }

    pub fn with_client(client: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Current access token, requesting a new one when the cached one expired.
    pub async fn access_token(&self) -> Result<String, ClientError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let (token, lifetime) = self.request_token().await?;
        debug!(
            auth_url = %self.credentials.auth_url,
            lifetime_secs = lifetime.as_secs(),
            "Obtained access token"
        );
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    /// Drop the cached token so the next call requests a new one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> Result<(String, Duration), ClientError> {
        let body = TokenRequest {
            grant_type: &self.credentials.grant_type,
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            audience: &self.credentials.audience,
        };

        let response = self
            .client
            .post(&self.credentials.auth_url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Token(format!(
                "token endpoint answered {}: {}",
                status, message
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Token(format!("invalid token response: {}", e)))?;

        if parsed.access_token.is_empty() {
            return Err(ClientError::Token(
                "token endpoint returned an empty token".to_string(),
            ));
        }

        let lifetime = parsed
            .expires_in
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Ok((parsed.access_token, lifetime))
    }
}
