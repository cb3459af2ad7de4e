//! OAuth credential type.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::tokens::{AccessToken, RefreshToken};

/// An access/refresh token pair plus its expiry.
///
/// Credentials are immutable: a refresh produces a new `Credential` that
/// replaces the old one inside the session.
///
/// # Example
///
/// ```
/// use netsession_core::Credential;
///
/// let credential = Credential::new("access", "refresh", None);
/// assert!(credential.is_valid_at(chrono::Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: AccessToken,
    refresh_token: RefreshToken,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

impl Credential {
    /// Create a credential with an explicit expiry.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            refresh_token: RefreshToken::new(refresh_token),
            expires_at,
        }
    }

    /// Create a credential whose expiry is read from the access token's
    /// `exp` claim.
    ///
    /// Opaque (non-JWT) tokens produce a credential without expiry.
    pub fn from_jwt(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let access_token = access_token.into();
        let expires_at = jwt_expiry(&access_token);
        Self::new(access_token, refresh_token, expires_at)
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &RefreshToken {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `false` once `expires_at` is reached. Credentials without an
    /// expiry are always valid until the server rejects them.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Reads the `exp` claim of a JWT without verifying its signature.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
