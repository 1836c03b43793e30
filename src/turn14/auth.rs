//! OAuth client-credentials token handling.
//!
//! Tokens are cached for 55 minutes (the API issues 60-minute tokens) and
//! invalidated explicitly when credentials change. Concurrent refreshes are
//! tolerated; the worst case is a redundant token fetch.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::Turn14ApiConfig;

const TOKEN_TTL_MINUTES: i64 = 55;

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it has not expired.
    pub async fn get(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|c| c.expires_at > Utc::now())
            .map(|c| c.token.clone())
    }

    pub async fn store(&self, token: String) {
        let mut guard = self.inner.write().await;
        *guard = Some(CachedToken { token, expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES) });
    }

    /// Drops the cached token. Called when credentials change.
    pub async fn invalidate(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetches a fresh bearer token. Any failure logs and yields `None`.
pub async fn fetch_token(http: &reqwest::Client, api: &Turn14ApiConfig) -> Option<String> {
    if !api.has_credentials() || api.base_url.trim().is_empty() {
        tracing::warn!("turn14 token fetch skipped: credentials or base url not configured");
        return None;
    }

    let url = format!("{}/v1/token", api.base_url.trim_end_matches('/'));
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", api.client_id.as_str()),
        ("client_secret", api.client_secret.as_str()),
    ];

    let response = match http
        .post(&url)
        .form(&params)
        .timeout(std::time::Duration::from_secs(api.timeout_secs))
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "turn14 token request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "turn14 token endpoint returned an error");
        return None;
    }

    match response.json::<TokenResponse>().await {
        Ok(body) if !body.access_token.is_empty() => Some(body.access_token),
        Ok(_) => {
            tracing::warn!("turn14 token response missing access_token");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "turn14 token response was not valid JSON");
            None
        }
    }
}
