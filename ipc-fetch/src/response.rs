//! Response envelopes.
//!
//! This module provides [`Response`]: the status line and headers of a
//! transfer plus its lazily read body.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use ipc_fetch_core::ResourceId;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::streaming::BodyStream;
use crate::transfer::TransferGuard;

/// The response head of a transfer and a handle to its body.
///
/// The body is read at most once, either as a [`BodyStream`] through
/// [`into_body`](Self::into_body) or through one of the draining helpers.
///
/// # Example
///
/// ```ignore
/// let response = client.fetch(FetchRequest::get("http://localhost/")).await?;
///
/// if response.ok() {
///     println!("{}", response.text().await?);
/// }
/// ```
#[derive(Debug)]
pub struct Response {
    url: String,
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: Option<BodyStream>,
    // Keeps the abort listener alive for bodyless responses
    _guard: Option<TransferGuard>,
}

impl Response {
    pub(crate) fn new(
        url: String,
        status: StatusCode,
        status_text: String,
        headers: HeaderMap,
        body: Option<BodyStream>,
        guard: Option<TransferGuard>,
    ) -> Self {
        Self {
            url,
            status,
            status_text,
            headers,
            body,
            _guard: guard,
        }
    }

    /// The request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status text reported by the host.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Returns whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `content-type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The host's body handle. `None` for bodyless responses and once the
    /// body has been taken.
    pub fn body_handle(&self) -> Option<ResourceId> {
        self.body.as_ref().map(BodyStream::body_handle)
    }

    /// Returns whether a body is still attached.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Consume the response and return its body stream.
    pub fn into_body(self) -> Option<BodyStream> {
        self.body
    }

    /// Detach the body stream, leaving the head in place.
    pub fn take_body(&mut self) -> Option<BodyStream> {
        self.body.take()
    }

    /// Read the whole body. A bodyless response yields empty bytes.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        match self.body {
            Some(body) => body.collect_bytes().await,
            None => Ok(Bytes::new()),
        }
    }

    /// Read the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, FetchError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the whole body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, FetchError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
