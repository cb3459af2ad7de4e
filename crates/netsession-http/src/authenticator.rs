//! OAuth refresh-token authenticator.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use netsession_core::credential::jwt_expiry;
use netsession_core::{AuthErrorPolicy, Authenticator, BaseUrl, Credential, Error, RefreshError};

use crate::transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// Default path of the refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh";

/// Request body for the refresh endpoint.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from the refresh endpoint.
///
/// A missing `refresh_token` means the old one stays valid. `expires_in` is
/// in seconds; without it the access token's JWT `exp` claim is used.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refreshes credentials against `POST {base}/{refresh_path}`.
///
/// The endpoint receives `{"refresh_token": "..."}` and answers with
/// `{"access_token": "...", "refresh_token": "...", "expires_in": 3600}`.
/// `400`, `401` and `403` mean the refresh token itself was rejected.
#[derive(Debug, Clone)]
pub struct OAuthAuthenticator {
    client: reqwest::Client,
    refresh_url: Url,
    auth_errors: AuthErrorPolicy,
}

impl OAuthAuthenticator {
    /// Create an authenticator for `refresh_path` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &BaseUrl, refresh_path: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| crate::transport::transport_error(e, DEFAULT_TIMEOUT))?;

        Ok(Self::with_client(client, base_url.join(refresh_path)))
    }

    /// Use an existing client and an absolute refresh URL.
    pub fn with_client(client: reqwest::Client, refresh_url: Url) -> Self {
        Self {
            client,
            refresh_url,
            auth_errors: AuthErrorPolicy::default(),
        }
    }

    /// Set which response statuses count as a rejected access token.
    #[must_use]
    pub fn with_auth_errors(mut self, auth_errors: AuthErrorPolicy) -> Self {
        self.auth_errors = auth_errors;
        self
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    #[instrument(skip(self, credential), fields(url = %self.refresh_url))]
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RefreshError> {
        debug!("Refreshing credential");

        let request = RefreshRequest {
            refresh_token: credential.refresh_token().as_str(),
        };

        let response = self
            .client
            .post(self.refresh_url.clone())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RefreshError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!(%status, "refresh token rejected");
            return Err(RefreshError::InvalidRefreshToken);
        }
        if !status.is_success() {
            return Err(RefreshError::Network {
                message: format!("refresh endpoint returned HTTP {status}"),
            });
        }

        let body: RefreshResponse = response.json().await.map_err(|e| RefreshError::Network {
            message: e.to_string(),
        })?;

        let expires_at = body
            .expires_in
            .and_then(|seconds| {
                let expires_at = expiry_after(Utc::now(), seconds);
                if expires_at.is_none() {
                    warn!(seconds, "ignoring out of range expires_in");
                }
                expires_at
            })
            .or_else(|| jwt_expiry(&body.access_token));
        let refresh_token = body
            .refresh_token
            .unwrap_or_else(|| credential.refresh_token().as_str().to_string());

        debug!(?expires_at, "Credential refreshed");
        Ok(Credential::new(body.access_token, refresh_token, expires_at))
    }

    fn is_auth_error(&self, status: u16) -> bool {
        self.auth_errors.is_auth_error(status)
    }
}

/// `now + seconds`, or `None` when that is not a representable instant.
pub(crate) fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_url_is_joined_to_base() {
        let base = BaseUrl::new("https://api.example.com/v1").unwrap();
        let auth = OAuthAuthenticator::new(&base, DEFAULT_REFRESH_PATH).unwrap();
        assert_eq!(
            auth.refresh_url().as_str(),
            "https://api.example.com/v1/auth/refresh"
        );
    }

    #[test]
    fn expiry_after_rejects_unrepresentable_lifetimes() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 60), Some(now + TimeDelta::seconds(60)));
        assert_eq!(expiry_after(now, i64::MAX), None);
        assert_eq!(expiry_after(now, i64::MIN), None);
        assert_eq!(expiry_after(DateTime::<Utc>::MAX_UTC, 1), None);
    }

    #[test]
    fn auth_error_policy_is_configurable() {
        let base = BaseUrl::new("https://api.example.com").unwrap();
        let auth = OAuthAuthenticator::new(&base, DEFAULT_REFRESH_PATH).unwrap();
        assert!(auth.is_auth_error(401));
        assert!(!auth.is_auth_error(403));

        let auth = auth.with_auth_errors(AuthErrorPolicy::default().with_forbidden());
        assert!(auth.is_auth_error(403));
    }
}
