//! Credential subcommands.

mod login;
mod logout;
mod refresh;
mod status;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Store a credential for the base URL
    Login(login::LoginArgs),

    /// Display the stored credential
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new credential
    Refresh(refresh::RefreshArgs),

    /// Forget the stored credential
    Logout(logout::LogoutArgs),
}

pub async fn handle(cmd: AuthCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, global),
        AuthSubcommand::Status(args) => status::run(args),
        AuthSubcommand::Refresh(args) => refresh::run(args, global).await,
        AuthSubcommand::Logout(args) => logout::run(args),
    }
}
