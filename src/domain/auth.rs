//! Authentication context types.
//!
//! The core treats authentication as a capability: a bearer credential plus
//! the authenticated user's own address, resolved once and handed into each
//! provider call. Acquisition and refresh live in the auth service; nothing
//! here performs I/O.

use chrono::{DateTime, Duration, Utc};

use super::NormalizedEmail;

/// An opaque OAuth bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token for use in an Authorization header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authenticated session context: credential, resolved user address,
/// and credential expiry.
///
/// Immutable once built; the auth service replaces the whole value on
/// refresh so concurrent readers never observe a torn token/expiry pair.
#[derive(Debug, Clone)]
pub struct AuthContext {
    token: BearerToken,
    user_email: NormalizedEmail,
    expires_at: DateTime<Utc>,
}

impl AuthContext {
    /// Builds a context from an issued token and the resolved user address.
    pub fn new(token: BearerToken, user_email: NormalizedEmail, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            user_email,
            expires_at,
        }
    }

    /// The bearer credential.
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// The authenticated user's own address.
    pub fn user_email(&self) -> &NormalizedEmail {
        &self.user_email
    }

    /// When the credential expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential is still usable at `now`, leaving `skew` as a
    /// safety margin before the actual expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(expires_in_secs: i64) -> AuthContext {
        AuthContext::new(
            BearerToken::new("token"),
            NormalizedEmail::new("me@co.com"),
            Utc::now() + Duration::seconds(expires_in_secs),
        )
    }

    #[test]
    fn fresh_well_before_expiry() {
        let ctx = context(3600);
        assert!(ctx.is_fresh_at(Utc::now(), Duration::seconds(60)));
    }

    #[test]
    fn stale_inside_skew_margin() {
        let ctx = context(30);
        assert!(!ctx.is_fresh_at(Utc::now(), Duration::seconds(60)));
    }

    #[test]
    fn stale_after_expiry() {
        let ctx = context(-10);
        assert!(!ctx.is_fresh_at(Utc::now(), Duration::seconds(0)));
    }
}
