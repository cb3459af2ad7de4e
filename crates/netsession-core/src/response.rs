//! Response classification and decoding.
//!
//! Every request ends in a [`RawResponse`]: either the HTTP response the
//! transport produced or the error that stopped the request earlier.
//! [`response_data`] and [`response_data_optional`] turn that into a typed
//! value or one of the errors in [`crate::error`].

use http::HeaderMap;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{DecodeError, Error};

/// A response as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn status_class(&self) -> Option<StatusClass> {
        StatusClass::of(self.status)
    }
}

/// The outcome of a request before decoding.
pub type RawResponse = Result<HttpResponse, Error>;

/// HTTP status classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// Returns `None` for codes outside `100..=599`.
    pub fn of(status: u16) -> Option<Self> {
        match status {
            100..=199 => Some(StatusClass::Informational),
            200..=299 => Some(StatusClass::Success),
            300..=399 => Some(StatusClass::Redirection),
            400..=499 => Some(StatusClass::ClientError),
            500..=599 => Some(StatusClass::ServerError),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusClass::ClientError | StatusClass::ServerError)
    }
}

/// Server-reported error payload.
///
/// Wire shape: `{"message": "...", "errors": {"field": ["...", ...]}}`.
/// Field order from the wire is preserved so "first" means first on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub message: String,
    #[serde(default)]
    pub errors: IndexMap<String, Vec<String>>,
}

impl ErrorObject {
    /// The first field validation message, or the top-level message when no
    /// field carries one.
    pub fn first_message(&self) -> &str {
        self.errors
            .values()
            .find_map(|messages| messages.first())
            .map_or(self.message.as_str(), String::as_str)
    }
}

/// Decode a response body into `T`.
///
/// # Errors
///
/// - errors already in `raw` are returned unchanged
/// - 4xx/5xx with an [`ErrorObject`] body: [`Error::ServerValidation`]
/// - 4xx/5xx without one, or a status outside `100..=599`:
///   [`Error::BadServerResponse`]
/// - a success body (including an empty one) that is not a `T`:
///   [`Error::Decode`]
pub fn response_data<T: DeserializeOwned>(raw: RawResponse) -> Result<T, Error> {
    let body = process_response(raw)?;
    decode_body(&body)
}

/// Like [`response_data`], except an empty success body yields `None`.
///
/// # Errors
///
/// See [`response_data`].
pub fn response_data_optional<T: DeserializeOwned>(raw: RawResponse) -> Result<Option<T>, Error> {
    let body = process_response(raw)?;
    if body.is_empty() {
        return Ok(None);
    }
    decode_body(&body).map(Some)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    if body.is_empty() {
        return Err(DecodeError::EmptyBody.into());
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "response body did not match expected type");
        Error::Decode(e.into())
    })
}

fn process_response(raw: RawResponse) -> Result<Vec<u8>, Error> {
    let response = raw?;
    trace!(status = response.status, len = response.body.len(), "classifying response");

    let Some(class) = response.status_class() else {
        return Err(Error::BadServerResponse {
            status: Some(response.status),
        });
    };

    if class.is_error() {
        return Err(error_from_body(response.status, &response.body));
    }

    Ok(response.body)
}

fn error_from_body(status: u16, body: &[u8]) -> Error {
    let is_object = serde_json::from_slice::<serde_json::Value>(body)
        .map(|value| value.is_object())
        .unwrap_or(false);
    if !is_object {
        return Error::BadServerResponse {
            status: Some(status),
        };
    }

    match serde_json::from_slice::<ErrorObject>(body) {
        Ok(object) => {
            debug!(status, ?object, "server reported error");
            Error::ServerValidation {
                status,
                message: object.first_message().to_string(),
            }
        }
        Err(_) => Error::BadServerResponse {
            status: Some(status),
        },
    }
}
