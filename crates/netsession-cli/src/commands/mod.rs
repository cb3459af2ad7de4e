//! Command implementations.

pub mod auth;
pub mod request;
pub mod upload;

use std::io::{self, Read};

use anyhow::{Context, Result};
use serde_json::Value;

/// Read JSON from an inline string, `@path` or `-` for stdin.
pub fn read_json(source: &str) -> Result<Value> {
    let content = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else if let Some(path) = source.strip_prefix('@') {
        std::fs::read_to_string(path).context("Failed to read JSON file")?
    } else {
        source.to_string()
    };

    serde_json::from_str(&content).context("Invalid JSON")
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Invalid header '{raw}', expected 'Name: value'"))?;
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "Invalid header '{raw}', empty name");
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("X-Trace: abc:123").unwrap(),
            ("X-Trace".to_string(), "abc:123".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn reads_inline_json() {
        assert_eq!(read_json(r#"{"a":1}"#).unwrap(), serde_json::json!({"a": 1}));
        assert!(read_json("{oops").is_err());
    }
}
