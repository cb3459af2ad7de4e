//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};

use netsession_core::Method;
use netsession_http::DEFAULT_REFRESH_PATH;

use crate::commands::auth::AuthCommand;
use crate::commands::request::RequestArgs;
use crate::commands::upload::UploadArgs;

/// Send authenticated requests to an HTTP API, refreshing the access token
/// when it expires.
#[derive(Parser, Debug)]
#[command(name = "netsession")]
#[command(author, version = env!("NETSESSION_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// API base URL (defaults to the one stored at login)
    #[arg(long, env = "NETSESSION_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Refresh endpoint, relative to the base URL
    #[arg(long, default_value = DEFAULT_REFRESH_PATH, global = true)]
    pub refresh_path: String,

    /// Treat 403 like 401 and refresh the token
    #[arg(long = "auth-403", global = true)]
    pub auth_forbidden: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the stored credential
    Auth(AuthCommand),

    /// Send a request and print the JSON response
    Request(RequestArgs),

    /// Upload a file as multipart form data
    Upload(UploadArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MethodArg> for Method {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Get => Method::GET,
            MethodArg::Post => Method::POST,
            MethodArg::Put => Method::PUT,
            MethodArg::Patch => Method::PATCH,
            MethodArg::Delete => Method::DELETE,
        }
    }
}
