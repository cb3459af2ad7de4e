//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;

use netsession_core::{Authenticator, RefreshError};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session::storage::{self, StoredSession};
use crate::session::{authenticator, resolve_base_url};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let stored = storage::load_session()
        .context("Failed to load session")?
        .context("No stored credential. Run 'netsession auth login' first.")?;
    let base_url = resolve_base_url(global, Some(&stored))?;
    let authenticator = authenticator(global, &base_url)?;

    output::note("Refreshing credential...");

    let credential = match authenticator.refresh(&stored.credential()).await {
        Ok(credential) => credential,
        Err(RefreshError::InvalidRefreshToken) => {
            storage::clear_session()?;
            anyhow::bail!("Refresh token rejected. Run 'netsession auth login' again.");
        }
        Err(err) => return Err(err).context("Failed to refresh credential"),
    };

    storage::save_session(&StoredSession::new(base_url, &credential))
        .context("Failed to save refreshed session")?;

    output::success("Credential refreshed");
    output::expiry(credential.expires_at());

    Ok(())
}
