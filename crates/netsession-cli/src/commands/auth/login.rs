//! Login command implementation.

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::Args;

use netsession_core::Credential;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session::resolve_base_url;
use crate::session::storage::{self, StoredSession};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Access token sent as the bearer credential
    #[arg(long)]
    pub access_token: String,

    /// Refresh token used to obtain new access tokens
    #[arg(long)]
    pub refresh_token: String,

    /// Access token lifetime in seconds (read from the JWT when omitted)
    #[arg(long)]
    pub expires_in: Option<i64>,
}

pub fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let stored = storage::load_session().unwrap_or_default();
    let base_url = resolve_base_url(global, stored.as_ref())?;

    let credential = match args.expires_in {
        Some(seconds) => {
            let expires_at = TimeDelta::try_seconds(seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .with_context(|| format!("--expires-in {seconds} is out of range"))?;
            Credential::new(args.access_token, args.refresh_token, Some(expires_at))
        }
        None => Credential::from_jwt(args.access_token, args.refresh_token),
    };

    storage::save_session(&StoredSession::new(base_url.clone(), &credential))?;

    output::success("Credential stored");
    println!();
    output::field("Base URL", base_url.as_str());
    output::expiry(credential.expires_at());

    Ok(())
}
