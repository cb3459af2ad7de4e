//! Request command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use netsession_core::{Endpoint, ParameterEncoding, RawResponse};

use crate::cli::{GlobalArgs, MethodArg};
use crate::commands::{parse_header, read_json};
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_enum)]
    pub method: MethodArg,

    /// Path relative to the base URL
    pub path: String,

    /// Parameters as JSON (inline, @file or - for stdin)
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Send parameters in the query string regardless of method
    #[arg(long)]
    pub query: bool,

    /// Extra header as 'Name: value' (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Attach the stored credential
    #[arg(long)]
    pub auth: bool,
}

pub async fn run(args: RequestArgs, global: &GlobalArgs) -> Result<()> {
    let mut endpoint = Endpoint::new(args.method.into(), &args.path);
    if let Some(data) = &args.data {
        endpoint = endpoint.with_json(read_json(data)?);
    }
    if args.query {
        endpoint = endpoint.with_encoding(ParameterEncoding::Query);
    }
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        endpoint = endpoint
            .try_header(&name, &value)
            .with_context(|| format!("Invalid header '{raw}'"))?;
    }
    if args.auth {
        endpoint = endpoint.with_auth();
    }

    let mut cli_session = CliSession::open(global)?;
    let raw = cli_session
        .session()
        .request(&endpoint)
        .context("Invalid request")?
        .response()
        .await;
    cli_session.persist()?;

    print_response(&cli_session, raw)
}

/// Print a JSON body, or a note when the response has none.
pub fn print_response(cli_session: &CliSession, raw: RawResponse) -> Result<()> {
    let body: Option<Value> = cli_session
        .session()
        .response_data_optional(raw)
        .context("Request failed")?;

    match body {
        Some(body) => output::json_pretty(&body),
        None => {
            output::note("No content");
            Ok(())
        }
    }
}
