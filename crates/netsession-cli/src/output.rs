//! Terminal output helpers.
//!
//! Response bodies and command results go to stdout. Notes about a response
//! and failures go to stderr so that `netsession request ... | jq` keeps
//! working.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print when a credential expires, relative to now.
pub fn expiry(expires_at: Option<DateTime<Utc>>) {
    let Some(expires_at) = expires_at else {
        field("Expires", "unknown");
        return;
    };

    let remaining = expires_at - Utc::now();
    let relative = if remaining.num_seconds() > 0 {
        format!("in {}m", remaining.num_minutes())
    } else {
        "expired".yellow().to_string()
    };
    field("Expires", &format!("{} ({relative})", expires_at.to_rfc3339()));
}

/// Print a status note to stderr.
pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a response body as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
