//! Request configuration for the HTTP-client adapter.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::cancel::CancelToken;
use super::headers::HeaderSource;
use super::url::encode_param;
use crate::error::FetchError;
use crate::request::RequestBody;

/// Custom query serializer, given the raw parameter pairs.
pub type ParamsSerializer = Arc<dyn Fn(&[(String, String)]) -> String + Send + Sync>;

#[derive(Clone, Debug)]
enum ParamsKind {
    Pairs(Vec<(String, String)>),
    Encoded(String),
}

impl Default for ParamsKind {
    fn default() -> Self {
        ParamsKind::Pairs(Vec::new())
    }
}

/// Query parameters appended to the request URL.
#[derive(Clone, Default)]
pub struct Params {
    kind: ParamsKind,
    serializer: Option<ParamsSerializer>,
}

impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Params")
            .field("kind", &self.kind)
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

impl Params {
    /// Parameters from key/value pairs. Repeated keys are kept in order.
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind: ParamsKind::Pairs(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            serializer: None,
        }
    }

    /// Parameters that are already encoded, appended verbatim.
    pub fn encoded(query: impl Into<String>) -> Self {
        Self {
            kind: ParamsKind::Encoded(query.into()),
            serializer: None,
        }
    }

    /// Encode any serializable value as a query string.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_qs::Error> {
        serde_qs::to_string(value).map(Self::encoded)
    }

    /// Use `serializer` instead of the default encoding for pairs.
    pub fn with_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[(String, String)]) -> String + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Append one pair. Turns pre-encoded parameters into `&`-joined pairs.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        match &mut self.kind {
            ParamsKind::Pairs(pairs) => pairs.push((key.into(), value.into())),
            ParamsKind::Encoded(query) => {
                if !query.is_empty() {
                    query.push('&');
                }
                query.push_str(&encode_param(&key.into()));
                query.push('=');
                query.push_str(&encode_param(&value.into()));
            }
        }
    }

    /// Returns whether there is nothing to append.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            ParamsKind::Pairs(pairs) => pairs.is_empty() && self.serializer.is_none(),
            ParamsKind::Encoded(query) => query.is_empty(),
        }
    }

    /// The query string, without a leading `?`.
    pub fn serialize(&self) -> String {
        match (&self.kind, &self.serializer) {
            (ParamsKind::Encoded(query), _) => query.clone(),
            (ParamsKind::Pairs(pairs), Some(serializer)) => serializer(pairs),
            (ParamsKind::Pairs(pairs), None) => pairs
                .iter()
                .map(|(k, v)| format!("{}={}", encode_param(k), encode_param(v)))
                .collect::<Vec<_>>()
                .join("&"),
        }
    }
}

/// How the response body is handed back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    /// Raw bytes.
    ArrayBuffer,
    /// Bytes tagged with the response content type.
    Blob,
    /// Multipart or urlencoded form fields.
    FormData,
    /// A parsed JSON document.
    Json,
    /// UTF-8 text.
    Text,
    /// The unread body stream.
    Stream,
}

impl ResponseType {
    /// The axios name of this representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::ArrayBuffer => "arraybuffer",
            ResponseType::Blob => "blob",
            ResponseType::FormData => "formdata",
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Stream => "stream",
        }
    }

    /// Pick a representation from a response content type.
    ///
    /// Unknown or missing content types read as text.
    pub fn infer(content_type: Option<&str>) -> Self {
        let ct = content_type.unwrap_or_default().to_ascii_lowercase();
        if ct.contains("application/json") {
            ResponseType::Json
        } else if ct.starts_with("text/") {
            ResponseType::Text
        } else if ct.contains("multipart/form-data") {
            ResponseType::FormData
        } else if ct.contains("application/octet-stream") {
            ResponseType::ArrayBuffer
        } else if ct.contains("application/blob") || ct.contains("image/") || ct.contains("video/")
        {
            ResponseType::Blob
        } else {
            ResponseType::Text
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arraybuffer" => Ok(ResponseType::ArrayBuffer),
            "blob" => Ok(ResponseType::Blob),
            "formdata" => Ok(ResponseType::FormData),
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "stream" => Ok(ResponseType::Stream),
            _ => Err(FetchError::UnsupportedResponseType(s.to_owned())),
        }
    }
}

/// An axios-style request configuration.
///
/// A copy of the configuration travels with every [`AdapterResponse`] and
/// [`AdapterError`] so callers can inspect what was sent.
///
/// # Example
///
/// ```ignore
/// use ipc_fetch::adapter::{AdapterConfig, ResponseType};
/// use std::time::Duration;
///
/// let config = AdapterConfig::new("/users")
///     .base_url("http://localhost")
///     .param("page", "2")
///     .header("accept", "application/json")
///     .response_type(ResponseType::Json)
///     .timeout(Duration::from_secs(5));
/// ```
///
/// [`AdapterResponse`]: super::AdapterResponse
/// [`AdapterError`]: super::AdapterError
#[derive(Clone, Debug, Default)]
pub struct AdapterConfig {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) base_url: Option<String>,
    pub(crate) params: Params,
    pub(crate) headers: HeaderSource,
    pub(crate) data: RequestBody,
    pub(crate) response_type: Option<ResponseType>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) signal: Option<CancellationToken>,
    pub(crate) cancel_token: Option<CancelToken>,
}

impl AdapterConfig {
    /// Create a GET configuration for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the base URL joined in front of relative URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Append one query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(key, value);
        self
    }

    /// Replace the query parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Serialize pair parameters with `serializer`.
    pub fn params_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[(String, String)]) -> String + Send + Sync + 'static,
    {
        self.params = self.params.with_serializer(serializer);
        self
    }

    /// Replace the headers.
    pub fn headers(mut self, headers: impl Into<HeaderSource>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Add one header after the existing ones.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = std::mem::take(&mut self.headers).with(name.into(), value.into());
        self
    }

    /// Set the request body.
    pub fn data(mut self, data: impl Into<RequestBody>) -> Self {
        self.data = data.into();
        self
    }

    /// Ask for a specific response representation.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Cancel the request if the response head takes longer than `timeout`.
    ///
    /// A zero duration disables the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation signal.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attach a cancel token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
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

    /// Get the base URL.
    pub fn get_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Get the query parameters.
    pub fn get_params(&self) -> &Params {
        &self.params
    }

    /// Get the headers.
    pub fn get_headers(&self) -> &HeaderSource {
        &self.headers
    }

    /// Get the body.
    pub fn get_data(&self) -> &RequestBody {
        &self.data
    }

    /// Get the requested response representation.
    pub fn get_response_type(&self) -> Option<ResponseType> {
        self.response_type
    }

    /// Get the timeout.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the cancellation signal.
    pub fn get_signal(&self) -> Option<&CancellationToken> {
        self.signal.as_ref()
    }

    /// Get the cancel token.
    pub fn get_cancel_token(&self) -> Option<&CancelToken> {
        self.cancel_token.as_ref()
    }
}
