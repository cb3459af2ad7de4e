//! Error types for netsession.
//!
//! This module provides a unified error type with explicit variants for
//! transport, decoding, server-reported, refresh, and input validation errors.

use thiserror::Error;

/// The unified error type for netsession operations.
///
/// Only auth failures are recovered inside the session (one refresh, one
/// retry). Every other variant reaches the caller untouched.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A 4xx/5xx response carrying a decodable error payload.
    #[error("{message}")]
    ServerValidation { status: u16, message: String },

    /// A 4xx/5xx response without a decodable error payload, or a response
    /// without a usable status.
    #[error("bad server response{}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    BadServerResponse { status: Option<u16> },

    /// The credential refresh failed.
    #[error("credential refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// A request gave up waiting for an in-flight refresh.
    #[error("timed out after {waited_ms}ms waiting for credential refresh")]
    Timeout { waited_ms: u64 },

    /// Authentication state errors (no credential configured).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Input validation errors (base URL, route, upload file).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// The request was cancelled through its handle.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ServerValidation { status, .. } => Some(*status),
            Error::BadServerResponse { status } => *status,
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Reading a request body from disk failed.
    #[error("body error: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Response body decoding errors.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// A non-optional decode was asked to read an empty body.
    #[error("empty response body")]
    EmptyBody,

    /// The body was present but did not match the target type.
    #[error("cannot decode response body: {message}")]
    Mismatch { message: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Mismatch {
            message: err.to_string(),
        }
    }
}

/// Credential refresh errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh call could not be completed.
    #[error("network failure during refresh: {message}")]
    Network { message: String },

    /// The server rejected the refresh token itself.
    #[error("refresh token invalid")]
    InvalidRefreshToken,
}

/// Authentication state errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// An auth-required request was made without a credential.
    #[error("no credential configured")]
    NotAuthenticated,

    /// The credential was cleared after a failed refresh.
    #[error("credential invalidated: {0}")]
    Invalidated(RefreshError),
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid base URL format.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// The session has no base URL to resolve routes against.
    #[error("no base URL configured")]
    MissingBaseUrl,

    /// A route path or its parameters could not be turned into a request.
    #[error("invalid route '{path}': {reason}")]
    Route { path: String, reason: String },

    /// A header name or value is not valid on the wire.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// An upload file could not be opened.
    #[error("cannot open upload file '{path}': {reason}")]
    File { path: String, reason: String },
}
