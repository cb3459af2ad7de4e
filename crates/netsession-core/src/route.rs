//! Route descriptors consumed by the session.
//!
//! A [`Route`] describes one API call: where it goes, how its parameters are
//! encoded, which extra headers it carries and whether it needs the bearer
//! token. An [`UploadRoute`] adds the file to stream as a multipart part.
//!
//! Applications usually implement [`Route`] on an enum of their endpoints;
//! [`Endpoint`] and [`FileUpload`] cover ad-hoc calls.

use std::path::PathBuf;

use http::header::{ACCEPT, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;

use crate::error::{Error, InvalidInputError};

/// The `Accept` value sent when a route does not override it.
pub const DEFAULT_ACCEPT: &str = "application/json";

/// How route parameters are placed in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterEncoding {
    /// Appended to the URL query string.
    Query,
    /// Serialized as the JSON request body.
    Json,
}

impl ParameterEncoding {
    /// GET parameters go into the query string, everything else into a JSON
    /// body.
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            ParameterEncoding::Query
        } else {
            ParameterEncoding::Json
        }
    }
}

/// Headers every route gets unless it overrides them.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers
}

/// An API call description.
pub trait Route: Send + Sync {
    /// Path appended to the session's base URL.
    fn path(&self) -> String;

    fn method(&self) -> Method;

    fn parameters(&self) -> Option<serde_json::Value> {
        None
    }

    fn encoding(&self) -> ParameterEncoding {
        ParameterEncoding::for_method(&self.method())
    }

    /// Extra headers. These override the session defaults.
    fn headers(&self) -> Option<HeaderMap> {
        Some(default_headers())
    }

    /// Whether the bearer token must be attached.
    fn add_auth(&self) -> bool {
        false
    }
}

/// A route whose body is a single file sent as multipart form data.
pub trait UploadRoute: Route {
    fn file_path(&self) -> PathBuf;

    /// Multipart field name, also the stem of the uploaded file name.
    fn file_name(&self) -> String;

    /// File name suffix, e.g. `".png"`.
    fn file_type(&self) -> String;

    fn mime_type(&self) -> String;
}

/// A ready-made [`Route`] for calls that don't warrant their own type.
///
/// # Example
///
/// ```
/// use netsession_core::{Endpoint, Method, Route};
///
/// let route = Endpoint::get("users/me").with_auth();
/// assert_eq!(route.method(), Method::GET);
/// assert!(route.add_auth());
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: String,
    method: Method,
    parameters: Option<serde_json::Value>,
    encoding: Option<ParameterEncoding>,
    headers: Option<HeaderMap>,
    add_auth: bool,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            parameters: None,
            encoding: None,
            headers: Some(default_headers()),
            add_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `parameters` into the route.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `parameters` cannot be represented
    /// as JSON.
    pub fn with_parameters<T: Serialize>(mut self, parameters: &T) -> serde_json::Result<Self> {
        self.parameters = Some(serde_json::to_value(parameters)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_json(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Set a header, replacing any value the route already had for `name`.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// [`with_header`](Self::with_header) for names and values only known
    /// at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::Header`] if either part is not a valid
    /// header token.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let invalid = |reason: String| InvalidInputError::Header {
            name: name.to_string(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        Ok(self.with_header(header_name, header_value))
    }

    /// Drop the default headers; only the session defaults apply.
    #[must_use]
    pub fn without_headers(mut self) -> Self {
        self.headers = None;
        self
    }

    #[must_use]
    pub fn with_auth(mut self) -> Self {
        self.add_auth = true;
        self
    }
}

impl Route for Endpoint {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> Method {
        self.method.clone()
    }

    fn parameters(&self) -> Option<serde_json::Value> {
        self.parameters.clone()
    }

    fn encoding(&self) -> ParameterEncoding {
        self.encoding
            .unwrap_or_else(|| ParameterEncoding::for_method(&self.method))
    }

    fn headers(&self) -> Option<HeaderMap> {
        self.headers.clone()
    }

    fn add_auth(&self) -> bool {
        self.add_auth
    }
}

/// A ready-made [`UploadRoute`].
#[derive(Debug, Clone)]
pub struct FileUpload {
    endpoint: Endpoint,
    file_path: PathBuf,
    file_name: String,
    file_type: String,
    mime_type: String,
}

impl FileUpload {
    /// Upload `file_path` with POST to `path`.
    ///
    /// `file_name` and `file_type` default to the file stem and its
    /// extension (with the leading dot).
    pub fn new(
        path: impl Into<String>,
        file_path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let file_type = file_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Self {
            endpoint: Endpoint::post(path),
            file_path,
            file_name,
            file_type,
            mime_type: mime_type.into(),
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.endpoint.method = method;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.endpoint = self.endpoint.with_header(name, value);
        self
    }

    #[must_use]
    pub fn with_auth(mut self) -> Self {
        self.endpoint = self.endpoint.with_auth();
        self
    }
}

impl Route for FileUpload {
    fn path(&self) -> String {
        self.endpoint.path()
    }

    fn method(&self) -> Method {
        self.endpoint.method()
    }

    fn headers(&self) -> Option<HeaderMap> {
        self.endpoint.headers()
    }

    fn add_auth(&self) -> bool {
        self.endpoint.add_auth()
    }
}

impl UploadRoute for FileUpload {
    fn file_path(&self) -> PathBuf {
        self.file_path.clone()
    }

    fn file_name(&self) -> String {
        self.file_name.clone()
    }

    fn file_type(&self) -> String {
        self.file_type.clone()
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }
}
