//! The CLI's session: stored credential plus a live `Session`.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use netsession_core::{AuthErrorPolicy, BaseUrl};
use netsession_http::{OAuthAuthenticator, Session, SessionConfig, SessionEvent};

use crate::cli::GlobalArgs;
use crate::output;
use storage::StoredSession;

/// A [`Session`] bound to the credential stored on disk.
///
/// Credentials the session refreshes are written back by
/// [`persist`](Self::persist); a failed refresh removes the stored one.
pub struct CliSession {
    session: Session,
    base_url: BaseUrl,
    events: broadcast::Receiver<SessionEvent>,
}

impl CliSession {
    /// Open a session for the configured base URL, restoring the stored
    /// credential when it belongs to the same API.
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let stored = storage::load_session().context("Failed to load session")?;
        let base_url = resolve_base_url(global, stored.as_ref())?;

        let stored = stored.filter(|stored| {
            let same_api = stored.base_url == base_url;
            if !same_api {
                warn!(stored = %stored.base_url, "stored credential belongs to another API, ignoring it");
            }
            same_api
        });

        let authenticator = authenticator(global, &base_url)?;
        let config = SessionConfig::new(base_url.clone())
            .with_timeout(Duration::from_secs(global.timeout));
        let session =
            Session::new(config, Arc::new(authenticator)).context("Failed to create session")?;
        session.set_credential(stored.as_ref().map(StoredSession::credential));

        let events = session.subscribe();
        Ok(Self {
            session,
            base_url,
            events,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Write back what happened to the credential since [`open`](Self::open).
    pub fn persist(&mut self) -> Result<()> {
        let mut refreshed = false;
        let mut logged_out = None;

        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::CredentialRefreshed { .. }) => refreshed = true,
                Ok(SessionEvent::LoggedOut { reason }) => logged_out = Some(reason),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "session events lagged");
                    refreshed = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if let Some(reason) = logged_out {
            storage::clear_session().context("Failed to clear session")?;
            output::error(&format!(
                "Session expired ({reason}). Run 'netsession auth login' again."
            ));
            return Ok(());
        }

        if refreshed && let Some(credential) = self.session.credential() {
            let stored = StoredSession::new(self.base_url.clone(), &credential);
            storage::save_session(&stored).context("Failed to save refreshed session")?;
        }

        Ok(())
    }
}

/// The base URL from the flag or environment, falling back to the stored one.
pub fn resolve_base_url(global: &GlobalArgs, stored: Option<&StoredSession>) -> Result<BaseUrl> {
    match (&global.base_url, stored) {
        (Some(url), _) => BaseUrl::new(url).context("Invalid base URL"),
        (None, Some(stored)) => Ok(stored.base_url.clone()),
        (None, None) => anyhow::bail!(
            "No base URL. Pass --base-url, set NETSESSION_BASE_URL or run 'netsession auth login'."
        ),
    }
}

/// The refresh authenticator configured by the global flags.
pub fn authenticator(global: &GlobalArgs, base_url: &BaseUrl) -> Result<OAuthAuthenticator> {
    let policy = if global.auth_forbidden {
        AuthErrorPolicy::default().with_forbidden()
    } else {
        AuthErrorPolicy::default()
    };

    Ok(OAuthAuthenticator::new(base_url, &global.refresh_path)
        .context("Failed to create authenticator")?
        .with_auth_errors(policy))
}
