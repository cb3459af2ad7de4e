//! Credential refresh trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::credential::Credential;
use crate::error::RefreshError;

/// Which HTTP statuses mean "the access token was rejected".
///
/// Servers disagree on whether `403` signals an expired token or a missing
/// permission, so only `401` is included unless configured otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthErrorPolicy {
    statuses: Vec<u16>,
}

impl AuthErrorPolicy {
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        let mut statuses: Vec<u16> = statuses.into_iter().collect();
        statuses.sort_unstable();
        statuses.dedup();
        Self { statuses }
    }

    /// Also treat `403 Forbidden` as an auth error.
    #[must_use]
    pub fn with_forbidden(self) -> Self {
        Self::new(self.statuses.into_iter().chain([403]))
    }

    pub fn is_auth_error(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }

    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }
}

impl Default for AuthErrorPolicy {
    fn default() -> Self {
        Self::new([401])
    }
}

/// Judges and renews credentials.
///
/// Implementations perform no locking of their own: the session guarantees
/// that at most one [`refresh`](Self::refresh) call is in flight per
/// credential.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `true` unless the credential is absent or past its expiry.
    fn is_credential_valid(&self, credential: Option<&Credential>, now: DateTime<Utc>) -> bool {
        credential.is_some_and(|c| c.is_valid_at(now))
    }

    /// Exchange the refresh token of `credential` for a new credential.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Network`] when the call could not be completed,
    /// [`RefreshError::InvalidRefreshToken`] when the server rejected the
    /// refresh token.
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RefreshError>;

    /// Whether a response with `status` was caused by a rejected access
    /// token.
    fn is_auth_error(&self, status: u16) -> bool {
        AuthErrorPolicy::default().is_auth_error(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct Noop;

    #[async_trait]
    impl Authenticator for Noop {
        async fn refresh(&self, _credential: &Credential) -> Result<Credential, RefreshError> {
            Err(RefreshError::InvalidRefreshToken)
        }
    }

    #[test]
    fn default_policy_is_401_only() {
        let policy = AuthErrorPolicy::default();
        assert!(policy.is_auth_error(401));
        assert!(!policy.is_auth_error(403));
        assert!(policy.with_forbidden().is_auth_error(403));
    }

    #[test]
    fn policy_dedups_statuses() {
        let policy = AuthErrorPolicy::new([403, 401, 401]);
        assert_eq!(policy.statuses(), &[401, 403]);
    }

    #[test]
    fn default_validity_check() {
        let now = Utc::now();
        let auth = Noop;
        assert!(!auth.is_credential_valid(None, now));

        let fresh = Credential::new("a", "r", Some(now + Duration::minutes(1)));
        assert!(auth.is_credential_valid(Some(&fresh), now));

        let stale = Credential::new("a", "r", Some(now - Duration::minutes(1)));
        assert!(!auth.is_credential_valid(Some(&stale), now));
        assert!(auth.is_auth_error(401));
    }
}
