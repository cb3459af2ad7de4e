//! Helpers for running the CLI binary in isolation.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

/// Run the CLI with a private HOME so session storage is isolated.
pub async fn run_cli_with_env(args: &[&str], home: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_netsession"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("NETSESSION_BASE_URL", base_url);
    cmd.env_remove("RUST_LOG");
    cmd.output().await.expect("Failed to execute CLI")
}

/// Run the CLI with a private HOME and expect success.
pub async fn run_cli_with_env_success(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli_with_env(args, home, base_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Where the CLI keeps its session under `home` (XDG layout).
pub fn session_file(home: &Path) -> PathBuf {
    home.join("data").join("netsession").join("session.json")
}

/// Read the stored session as JSON.
pub fn stored_session(home: &Path) -> Option<serde_json::Value> {
    let content = std::fs::read_to_string(session_file(home)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Store a credential through the CLI.
pub async fn login(home: &Path, base_url: &str, access: &str, refresh: &str) {
    run_cli_with_env_success(
        &[
            "auth",
            "login",
            "--access-token",
            access,
            "--refresh-token",
            refresh,
        ],
        home,
        base_url,
    )
    .await;
}
