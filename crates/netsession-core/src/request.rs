//! Transport-ready requests built from routes.

use std::fs::File;
use std::path::{Path, PathBuf};

use http::{HeaderMap, Method};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, InvalidInputError};
use crate::route::{ParameterEncoding, Route, UploadRoute};
use crate::types::BaseUrl;

/// A request on its way to the transport.
///
/// Created once per session `request`/`upload_file` call. The
/// authorization header is attached by the request interceptor right before
/// each send, so a retry differs from the first attempt only in that header.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    id: Uuid,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: RequestBody,
    auth_required: bool,
}

/// The body of a [`PendingRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Serialized JSON, sent with `Content-Type: application/json`.
    Json(Vec<u8>),
    /// A single file streamed as multipart form data.
    Multipart(MultipartFile),
}

/// A file part of a multipart upload.
///
/// Only the path is kept; the transport opens a fresh stream for every send
/// so a retried upload starts from the first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    pub path: PathBuf,
    /// Form field name.
    pub name: String,
    /// File name reported in the part's `Content-Disposition`.
    pub file_name: String,
    pub mime_type: String,
    /// Size in bytes at the time the request was built.
    pub length: u64,
}

impl PendingRequest {
    /// Build a request for `route` relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::Route`] if query parameters are not a
    /// JSON object.
    pub fn from_route<R: Route + ?Sized>(base: &BaseUrl, route: &R) -> Result<Self, Error> {
        let path = route.path();
        let mut url = base.join(&path);

        let body = match (route.parameters(), route.encoding()) {
            (None, _) => RequestBody::Empty,
            (Some(params), ParameterEncoding::Query) => {
                encode_query(&mut url, &params).map_err(|reason| InvalidInputError::Route {
                    path: path.clone(),
                    reason,
                })?;
                RequestBody::Empty
            }
            (Some(params), ParameterEncoding::Json) => {
                let bytes = serde_json::to_vec(&params).map_err(|e| InvalidInputError::Route {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                RequestBody::Json(bytes)
            }
        };

        Ok(Self {
            id: Uuid::new_v4(),
            method: route.method(),
            url,
            headers: route.headers().unwrap_or_default(),
            body,
            auth_required: route.add_auth(),
        })
    }

    /// Build a multipart upload request for `route` relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::File`] if the file cannot be opened.
    pub fn from_upload<R: UploadRoute + ?Sized>(
        base: &BaseUrl,
        route: &R,
    ) -> Result<Self, Error> {
        let path = route.file_path();
        let length = open_length(&path).map_err(|reason| InvalidInputError::File {
            path: path.display().to_string(),
            reason,
        })?;

        let file = MultipartFile {
            name: route.file_name(),
            file_name: format!("{}{}", route.file_name(), route.file_type()),
            mime_type: route.mime_type(),
            length,
            path,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            method: route.method(),
            url: base.join(&route.path()),
            headers: route.headers().unwrap_or_default(),
            body: RequestBody::Multipart(file),
            auth_required: route.add_auth(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Returns a copy with `headers` replacing the current header set.
    #[must_use]
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        Self {
            headers,
            ..self.clone()
        }
    }
}

fn open_length(path: &Path) -> Result<u64, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let metadata = file.metadata().map_err(|e| e.to_string())?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }
    Ok(metadata.len())
}

/// Append `params` to the query string of `url`.
///
/// Nested objects become `key[sub]=v`, arrays `key[]=v`; nulls are skipped.
fn encode_query(url: &mut Url, params: &Value) -> Result<(), String> {
    let Value::Object(map) = params else {
        return Err("query parameters must be a JSON object".to_string());
    };
    if map.is_empty() {
        return Ok(());
    }

    let mut pairs = url.query_pairs_mut();
    for (key, value) in map {
        append_pair(&mut pairs, key, value);
    }
    Ok(())
}

type QueryPairs<'a> = url::form_urlencoded::Serializer<'a, url::UrlQuery<'a>>;

fn append_pair(pairs: &mut QueryPairs<'_>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            pairs.append_pair(key, if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            pairs.append_pair(key, &n.to_string());
        }
        Value::String(s) => {
            pairs.append_pair(key, s);
        }
        Value::Array(items) => {
            let nested = format!("{key}[]");
            for item in items {
                append_pair(pairs, &nested, item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                append_pair(pairs, &format!("{key}[{sub}]"), item);
            }
        }
    }
}
