//! Bearer and refresh token types.

use std::fmt;

use http::HeaderValue;
use http::header::AUTHORIZATION;

use crate::error::InvalidInputError;

/// An access token sent as `Authorization: Bearer <token>`.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; only [`Credential::from_jwt`](crate::Credential::from_jwt)
///   peeks at the payload to read the expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    ///
    /// # Security
    ///
    /// Use only when constructing HTTP authorization headers or persisting
    /// the credential.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the full `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Returns the `Authorization` header value, marked sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::Header`] if the token contains bytes that
    /// cannot appear in a header.
    pub fn bearer_header(&self) -> Result<HeaderValue, InvalidInputError> {
        let mut value =
            HeaderValue::from_str(&self.bearer()).map_err(|e| InvalidInputError::Header {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A refresh token exchanged for a new credential when the access token is
/// rejected.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Create a new refresh token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in refresh requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}
