//! Single-flight credential refresh.
//!
//! An [`AuthInterceptor`] owns the current credential and the refresh state
//! for one session. Requests that need a fresh credential either start the
//! refresh (the first one to ask) or queue behind it; the refresh itself runs
//! on its own task so that cancelling any request never aborts it.
//!
//! ```text
//!            auth failure / expired credential
//!   Idle ──────────────────────────────────────► Refreshing { waiters }
//!    ▲                                                 │
//!    │  refresh ok: store credential, resume waiters   │
//!    └─────────────────────────────────────────────────┤
//!                                                      │ refresh failed:
//!                                                      ▼ clear credential
//!                                                 Failed(error)
//! ```

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use netsession_core::{AuthError, Authenticator, Credential, Error, RefreshError};

use crate::events::SessionEvent;

type RefreshOutcome = Result<Credential, RefreshError>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
    Failed(RefreshError),
}

struct InterceptorState {
    credential: Option<Credential>,
    refresh: RefreshState,
}

/// Serializes credential refreshes for one session.
pub struct AuthInterceptor {
    authenticator: Arc<dyn Authenticator>,
    state: Mutex<InterceptorState>,
    events: broadcast::Sender<SessionEvent>,
    wait_timeout: Option<Duration>,
    retired: AtomicBool,
}

/// What a caller has to do after inspecting the state under the lock.
enum Next {
    Ready(Credential),
    Wait(oneshot::Receiver<RefreshOutcome>),
}

impl AuthInterceptor {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        credential: Credential,
        events: broadcast::Sender<SessionEvent>,
        wait_timeout: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            authenticator,
            state: Mutex::new(InterceptorState {
                credential: Some(credential),
                refresh: RefreshState::Idle,
            }),
            events,
            wait_timeout,
            retired: AtomicBool::new(false),
        })
    }

    /// The current credential, `None` after a failed refresh.
    pub fn credential(&self) -> Option<Credential> {
        self.lock().credential.clone()
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(self.lock().refresh, RefreshState::Refreshing { .. })
    }

    /// Detach from the session. An in-flight refresh still completes and
    /// serves its waiters, but no longer reports events.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// The credential to send a request with.
    ///
    /// Returns immediately while the credential is valid. An expired
    /// credential starts a refresh; a refresh already in flight is joined.
    ///
    /// # Errors
    ///
    /// Fails with the refresh error, [`Error::Timeout`] when the wait budget
    /// runs out, or [`AuthError`] when no credential is left.
    pub async fn credential_for_request(self: &Arc<Self>) -> Result<Credential, Error> {
        let next = {
            let mut state = self.lock();
            match &mut state.refresh {
                RefreshState::Refreshing { waiters } => Next::Wait(enqueue(waiters)),
                RefreshState::Failed(err) => {
                    return Err(AuthError::Invalidated(err.clone()).into());
                }
                RefreshState::Idle => {
                    let credential = state
                        .credential
                        .clone()
                        .ok_or(AuthError::NotAuthenticated)?;
                    if self
                        .authenticator
                        .is_credential_valid(Some(&credential), Utc::now())
                    {
                        Next::Ready(credential)
                    } else {
                        debug!("credential expired, refreshing before send");
                        Next::Wait(self.begin_refresh(&mut state, credential))
                    }
                }
            }
        };

        self.resolve(next).await
    }

    /// A new credential after `rejected` was refused by the server.
    ///
    /// Starts a refresh only if none is running and `rejected` is still the
    /// current credential; a request that failed with an already replaced
    /// credential gets the replacement right away.
    ///
    /// # Errors
    ///
    /// Same as [`credential_for_request`](Self::credential_for_request).
    pub async fn refresh_after_failure(
        self: &Arc<Self>,
        rejected: &Credential,
    ) -> Result<Credential, Error> {
        let next = {
            let mut state = self.lock();
            match &mut state.refresh {
                RefreshState::Refreshing { waiters } => Next::Wait(enqueue(waiters)),
                RefreshState::Failed(err) => return Err(Error::Refresh(err.clone())),
                RefreshState::Idle => {
                    let current = state
                        .credential
                        .clone()
                        .ok_or(AuthError::NotAuthenticated)?;
                    if current == *rejected {
                        Next::Wait(self.begin_refresh(&mut state, current))
                    } else {
                        debug!("credential already replaced, retrying with current one");
                        Next::Ready(current)
                    }
                }
            }
        };

        self.resolve(next).await
    }

    fn begin_refresh(
        self: &Arc<Self>,
        state: &mut InterceptorState,
        credential: Credential,
    ) -> oneshot::Receiver<RefreshOutcome> {
        let (tx, rx) = oneshot::channel();
        state.refresh = RefreshState::Refreshing { waiters: vec![tx] };

        info!("Starting credential refresh");
        let this = Arc::clone(self);
        let authenticator = Arc::clone(&self.authenticator);
        let refresh = tokio::spawn(async move { authenticator.refresh(&credential).await });
        // Waiters are drained even if the authenticator panics.
        tokio::spawn(async move {
            let outcome = match refresh.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "Credential refresh task failed");
                    Err(RefreshError::Network {
                        message: format!("refresh task failed: {err}"),
                    })
                }
            };
            this.finish_refresh(outcome);
        });

        rx
    }

    fn finish_refresh(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            let next = match &outcome {
                Ok(credential) => {
                    state.credential = Some(credential.clone());
                    RefreshState::Idle
                }
                Err(err) => {
                    state.credential = None;
                    RefreshState::Failed(err.clone())
                }
            };
            match mem::replace(&mut state.refresh, next) {
                RefreshState::Refreshing { waiters } => waiters,
                _ => Vec::new(),
            }
        };

        match &outcome {
            Ok(credential) => {
                info!(waiters = waiters.len(), "Credential refresh succeeded");
                self.emit(SessionEvent::CredentialRefreshed {
                    credential: credential.clone(),
                });
            }
            Err(err) => {
                warn!(error = %err, waiters = waiters.len(), "Credential refresh failed, logging out");
                self.emit(SessionEvent::LoggedOut {
                    reason: err.clone(),
                });
            }
        }

        for waiter in waiters {
            // A dropped receiver is a cancelled or timed-out request.
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn resolve(&self, next: Next) -> Result<Credential, Error> {
        let rx = match next {
            Next::Ready(credential) => return Ok(credential),
            Next::Wait(rx) => rx,
        };

        let received = match self.wait_timeout {
            Some(budget) => tokio::time::timeout(budget, rx).await.map_err(|_| {
                warn!(?budget, "gave up waiting for credential refresh");
                Error::Timeout {
                    waited_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                }
            })?,
            None => rx.await,
        };

        match received {
            Ok(outcome) => outcome.map_err(Error::Refresh),
            Err(_) => Err(Error::Refresh(RefreshError::Network {
                message: "refresh ended without a result".to_string(),
            })),
        }
    }

    fn emit(&self, event: SessionEvent) {
        if !self.retired.load(Ordering::Acquire) {
            let _ = self.events.send(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, InterceptorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn enqueue(waiters: &mut Vec<oneshot::Sender<RefreshOutcome>>) -> oneshot::Receiver<RefreshOutcome> {
    let (tx, rx) = oneshot::channel();
    waiters.push(tx);
    debug!(waiters = waiters.len(), "waiting for in-flight refresh");
    rx
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("refreshing", &self.is_refreshing())
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Authenticator for Counting {
        async fn refresh(&self, _credential: &Credential) -> RefreshOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                Err(RefreshError::InvalidRefreshToken)
            } else {
                Ok(Credential::new(format!("access-{call}"), "refresh", None))
            }
        }
    }

    fn interceptor(fail: bool) -> (Arc<AuthInterceptor>, Arc<Counting>) {
        let auth = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail,
        });
        let (events, _) = broadcast::channel(8);
        let interceptor = AuthInterceptor::new(
            auth.clone(),
            Credential::new("access-0", "refresh", None),
            events,
            None,
        );
        (interceptor, auth)
    }

    #[tokio::test]
    async fn valid_credential_is_returned_without_refresh() {
        let (interceptor, auth) = interceptor(false);
        let credential = interceptor.credential_for_request().await.unwrap();
        assert_eq!(credential.access_token().as_str(), "access-0");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_rejection_reuses_current_credential() {
        let (interceptor, auth) = interceptor(false);
        let old = interceptor.credential().unwrap();

        let first = interceptor.refresh_after_failure(&old).await.unwrap();
        let second = interceptor.refresh_after_failure(&old).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    struct Panicking;

    #[async_trait]
    impl Authenticator for Panicking {
        async fn refresh(&self, _credential: &Credential) -> RefreshOutcome {
            panic!("refresh exploded");
        }
    }

    #[tokio::test]
    async fn panicking_refresh_fails_waiters_instead_of_hanging() {
        let (events, mut rx) = broadcast::channel(8);
        let interceptor = AuthInterceptor::new(
            Arc::new(Panicking),
            Credential::new("access-0", "refresh", None),
            events,
            None,
        );
        let old = interceptor.credential().unwrap();

        let err = interceptor.refresh_after_failure(&old).await.unwrap_err();
        assert!(matches!(err, Error::Refresh(RefreshError::Network { .. })));
        assert!(!interceptor.is_refreshing());
        assert!(interceptor.credential().is_none());
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::LoggedOut {
                reason: RefreshError::Network { .. }
            }
        ));
    }

    #[tokio::test]
    async fn failure_clears_credential_and_sticks() {
        let (interceptor, _auth) = interceptor(true);
        let old = interceptor.credential().unwrap();

        let err = interceptor.refresh_after_failure(&old).await.unwrap_err();
        assert!(matches!(err, Error::Refresh(RefreshError::InvalidRefreshToken)));
        assert!(interceptor.credential().is_none());

        let err = interceptor.credential_for_request().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Invalidated(_))));
    }
}
