//! Outbound requests.
//!
//! This module contains the request side of a transfer:
//! - [`FetchRequest`]: method, URL, headers, body and cancellation signal
//! - [`RequestBody`]: the buffered payload

mod body;

pub use body::RequestBody;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use ipc_fetch_core::OpenRequest;
use tokio_util::sync::CancellationToken;

/// A request to be carried over the RPC substrate.
///
/// # Example
///
/// ```ignore
/// use ipc_fetch::{FetchRequest, RequestBody};
/// use tokio_util::sync::CancellationToken;
///
/// let signal = CancellationToken::new();
/// let request = FetchRequest::post("http://localhost/items")
///     .header("x-request-id", "abc-123")
///     .body(RequestBody::json(&item)?)
///     .signal(signal.clone());
///
/// let response = client.fetch(request).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
    pub(crate) signal: Option<CancellationToken>,
}

impl FetchRequest {
    /// Create a GET request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Create a POST request for `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::POST)
    }

    /// Set the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header, replacing any previous value for the same name.
    ///
    /// Invalid names or values are dropped.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::debug!("dropping invalid request header"),
        }
        self
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a cancellation signal.
    ///
    /// The signal is observed, never cancelled, by the transfer.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Get the method.
    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// Get the URL.
    pub fn get_url(&self) -> &str {
        &self.url
    }

    /// Get the headers.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body.
    pub fn get_body(&self) -> &RequestBody {
        &self.body
    }

    /// Get the cancellation signal.
    pub fn get_signal(&self) -> Option<&CancellationToken> {
        self.signal.as_ref()
    }

    /// The headers that go on the wire.
    ///
    /// Caller headers win; `defaults` and the body's implied content type only
    /// fill names the caller left unset.
    pub(crate) fn effective_headers(&self, defaults: &HeaderMap) -> HeaderMap {
        let mut headers = self.headers.clone();
        for (name, value) in defaults {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        if let Some(content_type) = self.body.default_content_type() {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
        headers
    }

    /// Build the `open` payload.
    pub(crate) fn into_open_request(self, defaults: &HeaderMap) -> OpenRequest {
        let headers = self.effective_headers(defaults);
        OpenRequest {
            method: self.method.as_str().to_owned(),
            uri: self.url,
            headers: header_pairs(&headers),
            body: self.body.into_payload(),
        }
    }
}

/// Flatten a header map into name/value pairs.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
