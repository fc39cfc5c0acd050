//! OAuth2 access token handling.
//!
//! One [`TokenCache`] is shared by every request in the process. A valid token
//! is reused until shortly before it expires; when it has to be refreshed, only
//! one caller performs the exchange and everyone else waits for its result.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{DriveDavError, Result};

/// Tokens are considered expired this long before their declared expiry.
///
/// Short-lived tokens use half their lifetime instead.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Longest lifetime accepted from a token endpoint.
pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Opaque bearer value.
    pub value: String,
    /// Declared expiry.
    pub expires_at: Instant,
    /// How long before `expires_at` the token stops being used.
    margin: Duration,
}

impl AccessToken {
    /// Create a token that expires `expires_in` from now.
    ///
    /// Lifetimes above [`MAX_LIFETIME`] are clamped.
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        let lifetime = expires_in.min(MAX_LIFETIME);
        Self {
            value: value.into(),
            expires_at: Instant::now() + lifetime,
            margin: EXPIRY_MARGIN.min(lifetime / 2),
        }
    }

    /// Check if the token can still be attached to a request.
    pub fn is_fresh(&self) -> bool {
        Instant::now() + self.margin < self.expires_at
    }
}

/// One outbound token refresh.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Obtain a new access token.
    async fn exchange(&self) -> Result<AccessToken>;
}

/// Refresh-token grant against an OAuth2 token endpoint.
pub struct OAuthRefresh {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl OAuthRefresh {
    /// Create a refresh-token exchange.
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[async_trait]
impl TokenExchange for OAuthRefresh {
    async fn exchange(&self) -> Result<AccessToken> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| DriveDavError::Token(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveDavError::Token(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveDavError::Token(format!("invalid token response: {e}")))?;

        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }
}

/// Process-wide access token cache with single-flight refresh.
pub struct TokenCache {
    exchange: Arc<dyn TokenExchange>,
    current: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    /// Create an empty cache; the first caller triggers the first exchange.
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            exchange,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    fn cached(&self) -> Option<String> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.value.clone())
    }

    /// Return a valid bearer value, refreshing it if needed.
    pub async fn bearer(&self) -> Result<String> {
        if let Some(value) = self.cached() {
            return Ok(value);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(value) = self.cached() {
            return Ok(value);
        }

        tracing::debug!("Refreshing access token");
        let token = self.exchange.exchange().await.map_err(|e| {
            tracing::warn!(error = %e, "Access token refresh failed");
            e
        })?;
        let value = token.value.clone();
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(token);

        Ok(value)
    }

    /// Drop the cached token if it is still `rejected`, so the next caller
    /// refreshes.
    ///
    /// Called when the backend rejects a token before its declared expiry. A
    /// token that was already replaced by a newer one is left alone.
    pub fn invalidate(&self, rejected: &str) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if current.as_ref().is_some_and(|token| token.value == rejected) {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Exchange that counts calls and hands out numbered tokens.
    struct CountingExchange {
        calls: AtomicUsize,
        lifetime: Duration,
        delay: Duration,
    }

    impl CountingExchange {
        fn new(lifetime: Duration, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
                delay,
            }
        }
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(&self) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            Ok(AccessToken::new(format!("token-{n}"), self.lifetime))
        }
    }

    struct FailingExchange;

    #[async_trait]
    impl TokenExchange for FailingExchange {
        async fn exchange(&self) -> Result<AccessToken> {
            Err(DriveDavError::Token("invalid_grant".to_string()))
        }
    }

    #[test]
    fn test_token_freshness() {
        assert!(AccessToken::new("a", Duration::from_secs(3600)).is_fresh());
        assert!(!AccessToken::new("a", Duration::from_secs(0)).is_fresh());
    }

    #[test]
    fn test_short_lived_token_is_fresh() {
        // Below the 30s margin the token is still usable for half its lifetime.
        let token = AccessToken::new("a", Duration::from_secs(10));
        assert!(token.is_fresh());
        assert_eq!(token.margin, Duration::from_secs(5));
    }

    #[test]
    fn test_oversized_lifetime_is_clamped() {
        let token = AccessToken::new("a", Duration::from_secs(u64::MAX));
        assert!(token.is_fresh());
        assert!(token.expires_at <= Instant::now() + MAX_LIFETIME);
    }

    #[tokio::test]
    async fn test_short_lived_token_reused() {
        let exchange = Arc::new(CountingExchange::new(
            Duration::from_secs(20),
            Duration::ZERO,
        ));
        let cache = TokenCache::new(exchange.clone());

        cache.bearer().await.unwrap();
        cache.bearer().await.unwrap();
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_reused_while_valid() {
        let exchange = Arc::new(CountingExchange::new(
            Duration::from_secs(3600),
            Duration::ZERO,
        ));
        let cache = TokenCache::new(exchange.clone());

        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_refreshed() {
        let exchange = Arc::new(CountingExchange::new(Duration::ZERO, Duration::ZERO));
        let cache = TokenCache::new(exchange.clone());

        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(cache.bearer().await.unwrap(), "token-2");
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let exchange = Arc::new(CountingExchange::new(
            Duration::from_secs(3600),
            Duration::from_millis(50),
        ));
        let cache = Arc::new(TokenCache::new(exchange.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.bearer().await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let exchange = Arc::new(CountingExchange::new(
            Duration::from_secs(3600),
            Duration::ZERO,
        ));
        let cache = TokenCache::new(exchange.clone());

        let first = cache.bearer().await.unwrap();
        cache.invalidate(&first);
        assert_eq!(cache.bearer().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_invalidate_stale_token_keeps_current() {
        let exchange = Arc::new(CountingExchange::new(
            Duration::from_secs(3600),
            Duration::ZERO,
        ));
        let cache = TokenCache::new(exchange.clone());

        let first = cache.bearer().await.unwrap();
        cache.invalidate(&first);
        let second = cache.bearer().await.unwrap();

        // A slow request that still held the first token reports its 401 late.
        cache.invalidate(&first);

        assert_eq!(cache.bearer().await.unwrap(), second);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let cache = TokenCache::new(Arc::new(FailingExchange));

        let result = cache.bearer().await;
        assert!(matches!(result, Err(DriveDavError::Token(_))));
    }
}
