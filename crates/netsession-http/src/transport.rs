//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument, trace};

use netsession_core::{HttpResponse, PendingRequest, RequestBody, Transport, TransportError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("netsession/", env!("CARGO_PKG_VERSION"));

/// HTTP transport built on [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| transport_error(e, timeout))?;

        Ok(Self { client, timeout })
    }

    /// Wrap an existing client. Its own timeout settings apply.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    async fn body(
        &self,
        builder: reqwest::RequestBuilder,
        request: &PendingRequest,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) if request.headers().contains_key(CONTENT_TYPE) => {
                builder.body(bytes.clone())
            }
            RequestBody::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            RequestBody::Multipart(file) => {
                // Reopened on every send so a retry streams from the start.
                let stream = tokio::fs::File::open(&file.path).await.map_err(|e| {
                    TransportError::Body {
                        message: format!("{}: {e}", file.path.display()),
                    }
                })?;
                let part = Part::stream_with_length(stream, file.length)
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|e| transport_error(e, self.timeout))?;
                builder.multipart(Form::new().part(file.name.clone(), part))
            }
        };
        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(id = %request.id(), method = %request.method()))]
    async fn send(&self, request: &PendingRequest) -> Result<HttpResponse, TransportError> {
        debug!(url = %request.url(), "sending request");

        let builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        let builder = self.body(builder, request).await?;

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout))?
            .to_vec();

        trace!(status, len = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap();
        assert_eq!(transport.timeout, Duration::from_secs(30));
    }
}
