//! netsession-core - Types and traits for token-authenticated HTTP sessions.
//!
//! This crate holds everything that does not depend on an async runtime or
//! an HTTP client: credentials, route descriptors, transport-ready requests,
//! response classification, the request interceptor policy and the
//! [`Authenticator`]/[`Transport`] seams implemented by `netsession-http`.

pub mod credential;
pub mod error;
pub mod interceptor;
pub mod request;
pub mod response;
pub mod route;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credential::Credential;
pub use error::{AuthError, DecodeError, Error, InvalidInputError, RefreshError, TransportError};
pub use interceptor::{RequestInterceptor, RetryDecision};
pub use request::{MultipartFile, PendingRequest, RequestBody};
pub use response::{
    ErrorObject, HttpResponse, RawResponse, StatusClass, response_data, response_data_optional,
};
pub use route::{Endpoint, FileUpload, ParameterEncoding, Route, UploadRoute};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{AuthErrorPolicy, Authenticator, Transport};
pub use types::BaseUrl;

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, header};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
