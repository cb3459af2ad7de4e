//! Token-authenticated HTTP session.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use netsession_core::route::default_headers;
use netsession_core::{
    AuthError, Authenticator, BaseUrl, Credential, Error, HeaderMap, InvalidInputError,
    PendingRequest, RawResponse, RequestInterceptor, RetryDecision, Route, Transport,
    UploadRoute,
};

use crate::auth_interceptor::AuthInterceptor;
use crate::events::{DEFAULT_EVENT_CAPACITY, SessionEvent};
use crate::transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ReqwestTransport};

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: Option<BaseUrl>,
    pub timeout: Duration,
    pub user_agent: String,
    /// Headers applied to every request unless the route overrides them.
    pub default_headers: HeaderMap,
    /// How long a request waits for an in-flight refresh. `None` waits for
    /// as long as the refresh takes.
    pub refresh_wait_timeout: Option<Duration>,
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: default_headers(),
            refresh_wait_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn new(base_url: BaseUrl) -> Self {
        Self {
            base_url: Some(base_url),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    #[must_use]
    pub fn with_refresh_wait_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_wait_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// An HTTP session that attaches a bearer credential to protected routes and
/// refreshes it when the server rejects it.
///
/// Every request runs on its own tokio task and is retried at most once
/// after an auth failure. Concurrent auth failures share one refresh.
///
/// Sessions are cheap to clone and safe to share across tasks. Submitting a
/// request requires a running tokio runtime.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use netsession_core::{BaseUrl, Credential, Endpoint};
/// use netsession_http::{OAuthAuthenticator, Session, SessionConfig, DEFAULT_REFRESH_PATH};
///
/// # async fn example() -> Result<(), netsession_core::Error> {
/// let base = BaseUrl::new("https://api.example.com")?;
/// let authenticator = OAuthAuthenticator::new(&base, DEFAULT_REFRESH_PATH)?;
/// let session = Session::new(SessionConfig::new(base), Arc::new(authenticator))?;
/// session.set_credential(Some(Credential::from_jwt("access", "refresh")));
///
/// let me: serde_json::Value = session
///     .request(&Endpoint::get("me").with_auth())?
///     .response_data()
///     .await?;
/// println!("{me}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    interceptor: RequestInterceptor,
    authenticator: Arc<dyn Authenticator>,
    auth: RwLock<Option<Arc<AuthInterceptor>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create a session backed by [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SessionConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            authenticator,
        ))
    }

    /// Create a session over any [`Transport`].
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let interceptor = RequestInterceptor::new(Arc::clone(&authenticator))
            .with_default_headers(config.default_headers.clone());

        Self {
            inner: Arc::new(SessionInner {
                config,
                transport,
                interceptor,
                authenticator,
                auth: RwLock::new(None),
                events,
            }),
        }
    }

    pub fn base_url(&self) -> Option<&BaseUrl> {
        self.inner.config.base_url.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The current credential, `None` when logged out or after a failed
    /// refresh.
    pub fn credential(&self) -> Option<Credential> {
        self.auth().and_then(|auth| auth.credential())
    }

    /// Replace the credential.
    ///
    /// Refresh state starts over with the new credential. `None` logs out:
    /// protected requests then fail with [`AuthError::NotAuthenticated`]. A
    /// refresh still in flight completes for the requests already waiting on
    /// it, but its result is not kept.
    pub fn set_credential(&self, credential: Option<Credential>) {
        let next = credential.map(|credential| {
            AuthInterceptor::new(
                Arc::clone(&self.inner.authenticator),
                credential,
                self.inner.events.clone(),
                self.inner.config.refresh_wait_timeout,
            )
        });

        let previous = {
            let mut slot = self
                .inner
                .auth
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, next)
        };

        if let Some(previous) = previous {
            previous.retire();
        }
        debug!(authenticated = self.is_authenticated(), "credential replaced");
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// Receive [`SessionEvent`]s from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Submit a request for `route`.
    ///
    /// # Errors
    ///
    /// Fails without sending anything if no base URL is configured or the
    /// route parameters cannot be encoded.
    pub fn request<R: Route + ?Sized>(&self, route: &R) -> Result<RequestHandle, Error> {
        let base = self.require_base_url()?;
        let request = PendingRequest::from_route(base, route)?;
        Ok(self.submit(request))
    }

    /// Submit a multipart upload of the file behind `route`.
    ///
    /// # Errors
    ///
    /// Fails without sending anything if no base URL is configured or the
    /// file cannot be opened.
    pub fn upload_file<R: UploadRoute + ?Sized>(&self, route: &R) -> Result<RequestHandle, Error> {
        let base = self.require_base_url()?;
        let request = PendingRequest::from_upload(base, route)?;
        Ok(self.submit(request))
    }

    /// See [`netsession_core::response_data`].
    ///
    /// # Errors
    ///
    /// See [`netsession_core::response_data`].
    pub fn response_data<T: DeserializeOwned>(&self, raw: RawResponse) -> Result<T, Error> {
        netsession_core::response_data(raw)
    }

    /// See [`netsession_core::response_data_optional`].
    ///
    /// # Errors
    ///
    /// See [`netsession_core::response_data`].
    pub fn response_data_optional<T: DeserializeOwned>(
        &self,
        raw: RawResponse,
    ) -> Result<Option<T>, Error> {
        netsession_core::response_data_optional(raw)
    }

    fn require_base_url(&self) -> Result<&BaseUrl, Error> {
        self.base_url()
            .ok_or_else(|| InvalidInputError::MissingBaseUrl.into())
    }

    fn auth(&self) -> Option<Arc<AuthInterceptor>> {
        self.inner
            .auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn submit(&self, request: PendingRequest) -> RequestHandle {
        let id = request.id();
        let auth = self.auth();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.execute(auth, request).await });
        RequestHandle { id, task }
    }
}

impl SessionInner {
    #[instrument(skip_all, fields(id = %request.id(), method = %request.method(), url = %request.url()))]
    async fn execute(&self, auth: Option<Arc<AuthInterceptor>>, request: PendingRequest) -> RawResponse {
        let _ = self.events.send(SessionEvent::RequestStarted {
            id: request.id(),
            method: request.method().clone(),
            url: request.url().clone(),
        });
        let mut finished = FinishGuard {
            events: &self.events,
            id: request.id(),
            status: None,
        };

        let raw = self.send_with_retry(auth.as_ref(), &request).await;
        finished.status = raw.as_ref().ok().map(|response| response.status);
        debug!(status = ?finished.status, "request finished");
        raw
    }

    async fn send_with_retry(
        &self,
        auth: Option<&Arc<AuthInterceptor>>,
        request: &PendingRequest,
    ) -> RawResponse {
        let mut credential = match (request.auth_required(), auth) {
            (false, _) => None,
            (true, None) => return Err(AuthError::NotAuthenticated.into()),
            (true, Some(auth)) => Some(auth.credential_for_request().await?),
        };

        let mut attempt = 0;
        loop {
            let adapted = self.interceptor.adapt(request, credential.as_ref())?;
            let response = self.transport.send(&adapted).await?;

            let decision = self
                .interceptor
                .should_retry(request, Some(response.status), attempt);
            let (RetryDecision::Retry, Some(auth), Some(rejected)) =
                (decision, auth, credential.as_ref())
            else {
                return Ok(response);
            };

            info!(status = response.status, "credential rejected, retrying after refresh");
            credential = Some(auth.refresh_after_failure(rejected).await?);
            attempt += 1;
        }
    }
}

/// Reports `RequestFinished` when the request ends, including when its task
/// is aborted.
struct FinishGuard<'a> {
    events: &'a broadcast::Sender<SessionEvent>,
    id: Uuid,
    status: Option<u16>,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        let _ = self.events.send(SessionEvent::RequestFinished {
            id: self.id,
            status: self.status,
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.config.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// A submitted request.
///
/// Dropping the handle detaches the request; it still runs to completion.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    task: JoinHandle<RawResponse>,
}

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abort this request. Other requests, and a refresh this request may be
    /// waiting on, are unaffected.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the raw outcome. A cancelled request yields
    /// [`Error::Cancelled`].
    pub async fn response(self) -> RawResponse {
        match self.task.await {
            Ok(raw) => raw,
            Err(err) if err.is_cancelled() => Err(Error::Cancelled),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }

    /// Wait and decode the body, see [`netsession_core::response_data`].
    ///
    /// # Errors
    ///
    /// See [`netsession_core::response_data`].
    pub async fn response_data<T: DeserializeOwned>(self) -> Result<T, Error> {
        netsession_core::response_data(self.response().await)
    }

    /// Wait and decode the body, see
    /// [`netsession_core::response_data_optional`].
    ///
    /// # Errors
    ///
    /// See [`netsession_core::response_data`].
    pub async fn response_data_optional<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        netsession_core::response_data_optional(self.response().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsession_core::Endpoint;

    #[test]
    fn config_defaults() {
        let config = SessionConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert!(config.refresh_wait_timeout.is_none());
        assert_eq!(config.default_headers["accept"], "application/json");
    }

    #[tokio::test]
    async fn missing_base_url_is_rejected_before_sending() {
        let base = BaseUrl::new("https://api.example.com").unwrap();
        let authenticator =
            crate::OAuthAuthenticator::new(&base, crate::DEFAULT_REFRESH_PATH).unwrap();
        let session = Session::new(SessionConfig::default(), Arc::new(authenticator)).unwrap();

        let err = session.request(&Endpoint::get("me")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::MissingBaseUrl)
        ));
    }
}
