//! In-memory transport and authenticator for session tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use netsession_core::header::AUTHORIZATION;
use netsession_core::{
    Authenticator, BaseUrl, Credential, HttpResponse, PendingRequest, RefreshError, Transport,
    TransportError,
};
use netsession_http::{Session, SessionConfig};

/// Accepts exactly one access token and answers 401 to anything else.
/// Public requests always succeed.
pub struct FakeTransport {
    accepted: Mutex<Option<String>>,
    sent: Mutex<Vec<PendingRequest>>,
}

impl FakeTransport {
    pub fn new(accepted: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted: Mutex::new(Some(accepted.to_string())),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// A server that refuses every token, refreshed or not.
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            accepted: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn accept(&self, token: &str) {
        let mut accepted = self.accepted.lock().unwrap();
        if accepted.is_some() {
            *accepted = Some(token.to_string());
        }
    }

    pub fn sent(&self) -> Vec<PendingRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &PendingRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        if !request.auth_required() {
            return Ok(HttpResponse::new(200, br#"{"public":true}"#.to_vec()));
        }

        let expected = self
            .accepted
            .lock()
            .unwrap()
            .as_ref()
            .map(|token| format!("Bearer {token}"));
        let presented = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        match presented {
            Some(value) if Some(value) == expected.as_deref() => {
                let body = serde_json::json!({ "authorization": value });
                Ok(HttpResponse::new(200, body.to_string()))
            }
            _ => Ok(HttpResponse::new(401, br#"{"message":"token expired"}"#.to_vec())),
        }
    }
}

/// Counts refreshes. A successful refresh issues `fresh-<n>` and tells the
/// transport to accept it.
pub struct FakeAuthenticator {
    calls: AtomicUsize,
    delay: Duration,
    failure: Option<RefreshError>,
    panics: bool,
    transport: Arc<FakeTransport>,
}

impl FakeAuthenticator {
    pub fn succeeding(transport: Arc<FakeTransport>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            failure: None,
            panics: false,
            transport,
        })
    }

    /// Panics inside `refresh` after `delay`.
    pub fn panicking(transport: Arc<FakeTransport>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            failure: None,
            panics: true,
            transport,
        })
    }

    pub fn failing(
        transport: Arc<FakeTransport>,
        delay: Duration,
        failure: RefreshError,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            failure: Some(failure),
            panics: false,
            transport,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RefreshError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if self.panics {
            panic!("authenticator bug");
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let token = format!("fresh-{call}");
        self.transport.accept(&token);
        Ok(Credential::new(
            token,
            credential.refresh_token().as_str(),
            None,
        ))
    }
}

pub fn base_url() -> BaseUrl {
    BaseUrl::new("https://api.example.com").unwrap()
}

pub fn session(
    transport: &Arc<FakeTransport>,
    authenticator: &Arc<FakeAuthenticator>,
    config: SessionConfig,
) -> Session {
    Session::with_transport(config, transport.clone(), authenticator.clone())
}

pub fn stale_credential() -> Credential {
    Credential::new("stale", "refresh-1", None)
}
