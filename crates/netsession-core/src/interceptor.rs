//! Per-request adaptation and the auth retry policy.

use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::credential::Credential;
use crate::error::Error;
use crate::request::PendingRequest;
use crate::route::default_headers;
use crate::traits::Authenticator;

/// Whether a failed request should be sent again after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    DoNotRetry,
}

/// Attaches headers to outgoing requests and decides on the single auth
/// retry.
#[derive(Clone)]
pub struct RequestInterceptor {
    authenticator: Arc<dyn Authenticator>,
    default_headers: HeaderMap,
}

impl RequestInterceptor {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            default_headers: default_headers(),
        }
    }

    /// Replace the headers applied to every request. Route headers still
    /// override them.
    #[must_use]
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Returns `request` with default headers, route headers and, for
    /// auth-required requests, `Authorization: Bearer <token>`.
    ///
    /// Method, URL and body are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::Header`](crate::InvalidInputError::Header)
    /// if the access token cannot be carried in a header.
    pub fn adapt(
        &self,
        request: &PendingRequest,
        credential: Option<&Credential>,
    ) -> Result<PendingRequest, Error> {
        let mut headers = self.default_headers.clone();
        // Route values replace every default value of the same name.
        headers.extend(request.headers().clone());

        if request.auth_required()
            && let Some(credential) = credential
        {
            headers.insert(AUTHORIZATION, credential.access_token().bearer_header()?);
        }

        Ok(request.with_headers(headers))
    }

    /// Retry only the first attempt of an auth-required request whose
    /// response status is an auth error. Transport failures (`status` is
    /// `None`) are never retried here.
    pub fn should_retry(
        &self,
        request: &PendingRequest,
        status: Option<u16>,
        attempt_count: u32,
    ) -> RetryDecision {
        let auth_failure = status.is_some_and(|s| self.authenticator.is_auth_error(s));
        if attempt_count == 0 && request.auth_required() && auth_failure {
            RetryDecision::Retry
        } else {
            RetryDecision::DoNotRetry
        }
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}
