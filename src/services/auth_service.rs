//! Authentication service.
//!
//! Wraps the external auth collaborator behind [`TokenBroker`] and caches
//! the resolved [`AuthContext`] for the session. The cache holds a single
//! `Arc` that is only ever replaced wholesale, so concurrent requests never
//! observe a torn token/expiry pair. Expiry is checked with a clock-skew
//! margin so a credential about to lapse is refreshed rather than raced.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{AuthContext, BearerToken, NormalizedEmail};

/// Errors that can occur while resolving an authentication context.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable bearer credential could be obtained.
    #[error("authentication failed: {0}")]
    TokenUnavailable(String),

    /// The credential worked but the user's own address could not be
    /// resolved.
    #[error("could not resolve user address: {0}")]
    ProfileLookup(String),
}

/// Result type for auth operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// A bearer credential together with its expiry instant.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The credential.
    pub token: BearerToken,
    /// When the credential stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// External auth collaborator: yields bearer credentials and resolves the
/// authenticated user's own address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenBroker: Send + Sync {
    /// Obtains a fresh bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenUnavailable`] if no credential can be
    /// obtained.
    async fn fetch_token(&self) -> AuthResult<IssuedToken>;

    /// Resolves the authenticated user's own address for a credential.
    async fn fetch_user_email(&self, token: &BearerToken) -> AuthResult<NormalizedEmail>;
}

/// Resolves and caches the session [`AuthContext`].
///
/// Requests call [`context`](Self::context) at their start; a cached
/// context is reused until it comes within the clock-skew margin of its
/// expiry, at which point the broker is asked for a fresh credential and
/// the user address is re-resolved.
pub struct Authenticator {
    broker: Arc<dyn TokenBroker>,
    cache: RwLock<Option<Arc<AuthContext>>>,
    clock_skew: Duration,
}

impl Authenticator {
    /// Creates an authenticator over the given broker.
    pub fn new(broker: Arc<dyn TokenBroker>, clock_skew: Duration) -> Self {
        Self {
            broker,
            cache: RwLock::new(None),
            clock_skew,
        }
    }

    /// Returns a usable authentication context, refreshing if the cached
    /// one is missing or about to expire.
    pub async fn context(&self) -> AuthResult<Arc<AuthContext>> {
        if let Some(ctx) = self.cache.read().await.as_ref() {
            if ctx.is_fresh_at(Utc::now(), self.clock_skew) {
                return Ok(Arc::clone(ctx));
            }
        }

        // The lock is not held across the broker calls; if two requests
        // refresh at once, the last full context written wins.
        let issued = self.broker.fetch_token().await?;
        let user_email = self.broker.fetch_user_email(&issued.token).await?;
        let ctx = Arc::new(AuthContext::new(
            issued.token,
            user_email,
            issued.expires_at,
        ));

        *self.cache.write().await = Some(Arc::clone(&ctx));
        tracing::debug!(user = %ctx.user_email(), "authentication context refreshed");
        Ok(ctx)
    }
}
