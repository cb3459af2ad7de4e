//! HTTP transport trait.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::PendingRequest;
use crate::response::HttpResponse;

/// Sends fully adapted requests.
///
/// A transport reports every HTTP response it receives, whatever the
/// status; only failures to obtain a response at all are errors. Multipart
/// bodies are streamed from disk with their known length.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PendingRequest) -> Result<HttpResponse, TransportError>;
}
