//! Axios-style HTTP-client adapter.
//!
//! [`HttpAdapter`] accepts an [`AdapterConfig`], runs it as a transfer through
//! [`IpcFetch`], and reshapes the response into the representation the caller
//! asked for, or one inferred from the response `content-type`.
//!
//! ## Cancellation
//!
//! The config's signal, cancel token and timeout all feed one cancellation
//! token handed to the transfer:
//!
//! - the signal is the parent of that token
//! - the cancel token is linked onto it for as long as the transfer lives
//! - the timeout is a timer raced against the response head; it is dropped as
//!   soon as the head arrives or the request fails
//!
//! ## Example
//!
//! ```ignore
//! use ipc_fetch::adapter::{AdapterConfig, AdapterDefaults, HttpAdapter, ResponseData};
//! use std::time::Duration;
//!
//! let adapter = HttpAdapter::with_defaults(
//!     client,
//!     AdapterDefaults::new()
//!         .base_url("http://localhost")
//!         .timeout(Duration::from_secs(10)),
//! );
//!
//! let response = adapter.request(AdapterConfig::new("/users").param("page", "1")).await?;
//! if let ResponseData::Json(users) = response.data {
//!     println!("{users}");
//! }
//! ```

mod cancel;
mod config;
mod error;
mod headers;
mod materialize;
mod url;

pub use cancel::CancelToken;
pub use config::{AdapterConfig, Params, ParamsSerializer, ResponseType};
pub use error::{AdapterError, AdapterErrorCode, RequestSnapshot};
pub use headers::{HeaderObject, HeaderSource};
pub use materialize::{Blob, FormData, FormValue, ResponseData};
pub use url::{build_full_path, build_url, combine_urls, encode_param, is_absolute_url};

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::client::IpcFetch;
use crate::error::FetchError;
use crate::request::{FetchRequest, RequestBody};
use crate::response::Response;
use headers::headers_to_object;
use materialize::materialize;

/// Settings applied to every request made through an [`HttpAdapter`].
#[derive(Clone, Debug, Default)]
pub struct AdapterDefaults {
    base_url: Option<String>,
    timeout: Option<Duration>,
    headers: HeaderObject,
}

impl AdapterDefaults {
    /// Create empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL for configs that do not set one.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Timeout for configs that do not set one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header sent unless the config sets the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the default headers.
    pub fn headers(mut self, headers: impl Into<HeaderSource>) -> Self {
        self.headers = headers.into().normalize();
        self
    }

    /// Get the base URL.
    pub fn get_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Get the timeout.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the default headers.
    pub fn get_headers(&self) -> &HeaderObject {
        &self.headers
    }
}

/// A successful adapter response.
#[derive(Debug)]
pub struct AdapterResponse {
    /// The materialized body.
    pub data: ResponseData,
    pub status: StatusCode,
    pub status_text: String,
    /// Response headers, flattened.
    pub headers: HeaderObject,
    /// The configuration that produced this response.
    pub config: AdapterConfig,
}

/// Runs axios-style request configs over an [`IpcFetch`] client.
#[derive(Clone, Debug)]
pub struct HttpAdapter {
    client: IpcFetch,
    defaults: AdapterDefaults,
}

impl HttpAdapter {
    /// Create an adapter with empty defaults.
    pub fn new(client: IpcFetch) -> Self {
        Self::with_defaults(client, AdapterDefaults::default())
    }

    /// Create an adapter with explicit defaults.
    pub fn with_defaults(client: IpcFetch, defaults: AdapterDefaults) -> Self {
        Self { client, defaults }
    }

    /// The underlying client.
    pub fn client(&self) -> &IpcFetch {
        &self.client
    }

    /// The adapter defaults.
    pub fn defaults(&self) -> &AdapterDefaults {
        &self.defaults
    }

    /// Issue a GET request for `url`.
    pub async fn get(&self, url: impl Into<String>) -> Result<AdapterResponse, AdapterError> {
        self.request(AdapterConfig::new(url)).await
    }

    /// Issue a POST request for `url` with `data` as the body.
    pub async fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<RequestBody>,
    ) -> Result<AdapterResponse, AdapterError> {
        self.request(AdapterConfig::new(url).method(Method::POST).data(data))
            .await
    }

    /// Run `config` and materialize the response.
    ///
    /// # Errors
    ///
    /// - [`AdapterErrorCode::Canceled`] when the signal, cancel token or
    ///   timeout fired
    /// - [`AdapterErrorCode::BadRequest`] when the transfer failed before the
    ///   response head arrived
    /// - [`AdapterErrorCode::BadResponse`] when the body could not be read
    ///   into the requested representation
    pub async fn request(&self, config: AdapterConfig) -> Result<AdapterResponse, AdapterError> {
        let base_url = config
            .base_url
            .as_deref()
            .or(self.defaults.base_url.as_deref());
        let url = build_url(&build_full_path(base_url, &config.url), &config.params);
        let timeout = config
            .timeout
            .or(self.defaults.timeout)
            .filter(|t| !t.is_zero());

        let signal = config
            .signal
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let mut link = config
            .cancel_token
            .as_ref()
            .and_then(|token| token.link(&signal));

        let mut request = FetchRequest::new(url)
            .method(config.method.clone())
            .body(config.data.clone())
            .signal(signal.clone());
        for (name, value) in self.defaults.headers.iter().chain(&config.headers.normalize()) {
            request = request.header(name.as_str(), value.as_str());
        }
        let snapshot = RequestSnapshot {
            url: request.get_url().to_owned(),
            method: request.get_method().clone(),
            headers: headers_to_object(&request.effective_headers(self.client.default_headers())),
            body: config.data.clone().into_payload().map(Bytes::from),
        };

        let response = match self.await_head(request, &signal, timeout).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url = %snapshot.url, error = %err, "adapter request failed");
                return Err(AdapterError::request_failed(err, config));
            }
        };

        let status = response.status();
        let status_text = response.status_text().to_owned();
        let headers = headers_to_object(response.headers());
        let content_type = response.content_type().map(str::to_owned);
        let response_type = config
            .response_type
            .unwrap_or_else(|| ResponseType::infer(content_type.as_deref()));

        let data = match response.into_body() {
            None => ResponseData::Null,
            Some(body) => match materialize(body, response_type, content_type.as_deref()).await {
                Ok(ResponseData::Stream(mut stream)) => {
                    if let Some(link) = link.take() {
                        stream.link(link);
                    }
                    ResponseData::Stream(stream)
                }
                Ok(data) => data,
                Err(err) => {
                    tracing::debug!(
                        url = %snapshot.url,
                        response_type = %response_type,
                        error = %err,
                        "response materialization failed"
                    );
                    return Err(AdapterError::bad_response(err, config, snapshot));
                }
            },
        };

        Ok(AdapterResponse {
            data,
            status,
            status_text,
            headers,
            config,
        })
    }

    /// Fetch the response head, cancelling `signal` if `timeout` elapses first.
    async fn await_head(
        &self,
        request: FetchRequest,
        signal: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<Response, FetchError> {
        let Some(timeout) = timeout else {
            return self.client.fetch(request).await;
        };

        let client = self.client.clone();
        let mut fetch = Box::pin(async move { client.fetch(request).await });
        tokio::select! {
            biased;
            result = &mut fetch => result,
            _ = tokio::time::sleep(timeout) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                signal.cancel();
                // the pending call observes the signal once it returns and
                // sends the cancel notification itself
                tokio::spawn(fetch);
                Err(FetchError::Canceled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHost, Script};
    use futures::StreamExt;
    use ipc_fetch_core::data_chunk;
    use serde_json::json;
    use std::sync::Arc;

    fn adapter(host: &Arc<MockHost>) -> HttpAdapter {
        HttpAdapter::new(IpcFetch::new(host.clone()))
    }

    #[tokio::test]
    async fn test_json_inferred_from_content_type() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "application/json")
                .body(br#"{"a":1}"#),
        );
        let response = adapter(&host)
            .request(
                AdapterConfig::new("http://localhost/post")
                    .method(Method::POST)
                    .header("content-type", "application/json")
                    .data(RequestBody::bytes(&br#"{"a":1}"#[..])),
            )
            .await
            .unwrap();

        assert_eq!(response.data.as_json(), Some(&json!({"a": 1})));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers.get("content-type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_arraybuffer_round_trip() {
        let payload = vec![0u8, 1, 2, 254, 255, 0];
        let host = MockHost::new(Script::default().body(&payload));

        let response = adapter(&host)
            .request(
                AdapterConfig::new("http://localhost/echo")
                    .method(Method::PUT)
                    .data(payload.clone())
                    .response_type(ResponseType::ArrayBuffer),
            )
            .await
            .unwrap();

        assert_eq!(host.open_calls()[0].body.as_deref(), Some(&payload[..]));
        assert_eq!(response.data.as_bytes().unwrap().as_ref(), &payload[..]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_request() {
        let host = MockHost::new(Script::default().hold_send());
        let start = tokio::time::Instant::now();

        let err = adapter(&host)
            .request(AdapterConfig::new("http://localhost/slow").timeout(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(err.code(), AdapterErrorCode::Canceled);
        assert_eq!(err.message(), "Request cancelled");

        host.settle().await;
        assert_eq!(host.cancel_calls(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_during_open_still_notifies_host() {
        let host = MockHost::new(Script::default().delay_open(Duration::from_millis(100)));
        let start = tokio::time::Instant::now();

        let err = adapter(&host)
            .request(AdapterConfig::new("http://localhost/slow").timeout(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert_eq!(err.code(), AdapterErrorCode::Canceled);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(host.open_calls().len(), 1);
        assert!(host.cancel_calls().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        host.settle().await;
        assert_eq!(host.cancel_calls(), vec![2]);
        assert_eq!(host.send_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cleared_after_headers() {
        let host = MockHost::new(Script::default().hold_body());
        let response = adapter(&host)
            .request(
                AdapterConfig::new("http://localhost/stream")
                    .timeout(Duration::from_millis(50))
                    .response_type(ResponseType::Stream),
            )
            .await
            .unwrap();
        let mut stream = response.data.into_stream().unwrap();
        assert!(futures::poll!(stream.next()).is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        host.push_chunk(data_chunk(b"still open"));

        assert_eq!(stream.next().await.unwrap().unwrap(), "still open");
        host.settle().await;
        assert!(host.cancel_calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_timeout_zero_disables() {
        let host = MockHost::new(Script::default().body(b"ok"));
        let adapter = HttpAdapter::with_defaults(
            IpcFetch::new(host.clone()),
            AdapterDefaults::new().timeout(Duration::ZERO),
        );
        let response = adapter.get("http://localhost/").await.unwrap();
        assert_eq!(response.data.as_text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_cancelled_token_makes_no_calls() {
        let host = MockHost::new(Script::default().body(b"unused"));
        let (token, cancel) = CancelToken::source();
        cancel("not needed");

        let err = adapter(&host)
            .request(AdapterConfig::new("http://localhost/").cancel_token(token))
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert_eq!(err.code().as_str(), "ERR_CANCELED");
        host.settle().await;
        assert_eq!(host.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_token_aborts_stream() {
        let host = MockHost::new(Script::default().hold_body());
        let token = CancelToken::new();
        let response = adapter(&host)
            .request(
                AdapterConfig::new("http://localhost/stream")
                    .cancel_token(token.clone())
                    .response_type(ResponseType::Stream),
            )
            .await
            .unwrap();
        let mut stream = response.data.into_stream().unwrap();
        assert!(futures::poll!(stream.next()).is_pending());

        token.cancel("stop");
        assert!(stream.next().await.unwrap().unwrap_err().is_canceled());
        host.settle().await;
        assert_eq!(host.cancel_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_caller_signal_cancels() {
        let host = MockHost::new(Script::default().hold_send());
        let signal = CancellationToken::new();
        let adapter = adapter(&host);

        let request = adapter.request(AdapterConfig::new("http://localhost/").signal(signal.clone()));
        let abort = async {
            tokio::task::yield_now().await;
            signal.cancel();
        };
        let (result, ()) = tokio::join!(request, abort);
        assert_eq!(result.unwrap_err().code(), AdapterErrorCode::Canceled);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_response() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "application/json")
                .body(b"{oops"),
        );
        let err = adapter(&host)
            .request(AdapterConfig::new("/items").base_url("http://localhost/api/"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), AdapterErrorCode::BadResponse);
        let snapshot = err.request().unwrap();
        assert_eq!(snapshot.url, "http://localhost/api/items");
        assert_eq!(snapshot.method, Method::GET);
        assert_eq!(snapshot.body, None);
        assert_eq!(err.config().get_url(), "/items");
    }

    #[tokio::test]
    async fn test_snapshot_records_wire_headers_and_body() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "application/json")
                .body(b"{oops"),
        );
        let client = IpcFetch::builder(host.clone())
            .default_header("x-app", "demo")
            .build();
        let err = HttpAdapter::new(client)
            .request(
                AdapterConfig::new("http://localhost/items")
                    .method(Method::POST)
                    .data(json!({"a": 1})),
            )
            .await
            .unwrap_err();

        let snapshot = err.request().unwrap();
        assert_eq!(snapshot.headers.get("x-app").map(String::as_str), Some("demo"));
        assert_eq!(
            snapshot.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(snapshot.body.as_deref(), Some(&br#"{"a":1}"#[..]));

        let sent = &host.open_calls()[0];
        assert_eq!(sent.body.as_deref(), snapshot.body.as_deref());
        assert_eq!(sent.headers.len(), snapshot.headers.len());
    }

    #[tokio::test]
    async fn test_transport_failure_is_bad_request() {
        let host = MockHost::new(Script::default().fail_send("connection refused"));
        let err = adapter(&host).get("http://localhost/").await.unwrap_err();
        assert_eq!(err.code(), AdapterErrorCode::BadRequest);
        assert_eq!(err.message(), "connection refused");
        assert!(err.request().is_none());
    }

    #[tokio::test]
    async fn test_bodyless_response_is_null() {
        let host = MockHost::new(Script::default().status(204, "No Content"));
        let response = adapter(&host).get("http://localhost/").await.unwrap();
        assert!(response.data.is_null());
        assert_eq!(response.status_text, "No Content");
        assert_eq!(host.read_calls(), 0);
    }

    #[tokio::test]
    async fn test_url_headers_and_params_on_the_wire() {
        let host = MockHost::new(Script::default().no_body());
        let adapter = HttpAdapter::with_defaults(
            IpcFetch::new(host.clone()),
            AdapterDefaults::new()
                .base_url("http://localhost/v1/")
                .header("x-client", "adapter")
                .header("accept", "text/plain"),
        );

        adapter
            .request(
                AdapterConfig::new("/search#results")
                    .param("q", "rust lang")
                    .param("range", "[1,2]")
                    .headers(json!({"Accept": "application/json"})),
            )
            .await
            .unwrap();

        let opened = &host.open_calls()[0];
        assert_eq!(opened.method, "GET");
        assert_eq!(opened.uri, "http://localhost/v1/search?q=rust+lang&range=[1,2]");
        let header = |name: &str| {
            opened
                .headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(header("accept").as_deref(), Some("application/json"));
        assert_eq!(header("x-client").as_deref(), Some("adapter"));
    }

    #[tokio::test]
    async fn test_form_data_response() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "application/x-www-form-urlencoded")
                .body(b"name=ferris&lang=rust"),
        );
        let response = adapter(&host)
            .request(AdapterConfig::new("http://localhost/form").response_type(ResponseType::FormData))
            .await
            .unwrap();

        let ResponseData::FormData(form) = response.data else {
            panic!("expected form data");
        };
        assert_eq!(form.get("name").unwrap().as_text(), Some("ferris"));
        assert_eq!(form.len(), 2);
    }

    #[tokio::test]
    async fn test_blob_and_text_inference() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "image/png")
                .body(&[137, 80, 78, 71]),
        );
        let response = adapter(&host).get("http://localhost/logo.png").await.unwrap();
        let ResponseData::Blob(blob) = response.data else {
            panic!("expected a blob");
        };
        assert_eq!(blob.content_type(), "image/png");
        assert_eq!(blob.size(), 4);

        let host = MockHost::new(Script::default().body(b"plain"));
        let response = adapter(&host).get("http://localhost/").await.unwrap();
        assert_eq!(response.data.as_text(), Some("plain"));
    }
}
