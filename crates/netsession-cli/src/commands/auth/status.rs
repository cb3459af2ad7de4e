//! Status command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use crate::output;
use crate::session::storage;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs) -> Result<()> {
    let stored = storage::load_session()
        .context("Failed to load session")?
        .context("No stored credential. Run 'netsession auth login' first.")?;
    let credential = stored.credential();

    output::field("Base URL", stored.base_url.as_str());
    output::expiry(credential.expires_at());
    let state = if credential.is_valid_at(Utc::now()) {
        "valid"
    } else {
        "expired (refreshed on next request)"
    };
    output::field("Access token", state);

    Ok(())
}
