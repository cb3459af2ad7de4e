//! Upload command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use netsession_core::FileUpload;

use crate::cli::{GlobalArgs, MethodArg};
use crate::commands::request::print_response;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Path relative to the base URL
    pub path: String,

    /// File to upload
    pub file: PathBuf,

    /// MIME type of the file
    #[arg(long, default_value = "application/octet-stream")]
    pub mime_type: String,

    /// Form field name (defaults to the file name without extension)
    #[arg(long)]
    pub name: Option<String>,

    /// HTTP method
    #[arg(long, value_enum, default_value = "post")]
    pub method: MethodArg,

    /// Attach the stored credential
    #[arg(long)]
    pub auth: bool,
}

pub async fn run(args: UploadArgs, global: &GlobalArgs) -> Result<()> {
    let mut upload =
        FileUpload::new(&args.path, &args.file, &args.mime_type).with_method(args.method.into());
    if let Some(name) = &args.name {
        upload = upload.with_file_name(name);
    }
    if args.auth {
        upload = upload.with_auth();
    }

    let mut cli_session = CliSession::open(global)?;
    output::note(&format!("Uploading {}...", args.file.display()));

    let raw = cli_session
        .session()
        .upload_file(&upload)
        .with_context(|| format!("Cannot upload {}", args.file.display()))?
        .response()
        .await;
    cli_session.persist()?;

    print_response(&cli_session, raw)
}
