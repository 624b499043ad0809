//! The fetch client.
//!
//! This module provides [`IpcFetch`], which runs [`FetchRequest`]s as
//! transfers over a [`HostRpc`].

use std::sync::Arc;

use http::HeaderMap;
use ipc_fetch_core::HostRpc;
use tracing::{Instrument, info_span};

use crate::builder::ClientBuilder;
use crate::error::FetchError;
use crate::request::FetchRequest;
use crate::response::Response;
use crate::transfer::{CancelNotifier, Transfer, watch_signal};

/// Client that carries HTTP-shaped requests over a host's RPC calls.
///
/// Cloning is cheap; clones share the host.
///
/// # Example
///
/// ```ignore
/// use ipc_fetch::{FetchRequest, IpcFetch};
///
/// let client = IpcFetch::builder(host).build();
/// let response = client.fetch(FetchRequest::get("http://localhost/")).await?;
/// println!("{} {}", response.status(), response.text().await?);
/// ```
#[derive(Clone)]
pub struct IpcFetch {
    host: Arc<dyn HostRpc>,
    default_headers: HeaderMap,
}

impl std::fmt::Debug for IpcFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcFetch")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl IpcFetch {
    /// Create a new client builder over `host`.
    pub fn builder<H: HostRpc>(host: H) -> ClientBuilder {
        ClientBuilder::new(host)
    }

    /// Create a client with no default headers.
    pub fn new<H: HostRpc>(host: H) -> Self {
        ClientBuilder::new(host).build()
    }

    pub(crate) fn from_parts(host: Arc<dyn HostRpc>, default_headers: HeaderMap) -> Self {
        Self {
            host,
            default_headers,
        }
    }

    /// The headers applied to requests that do not set them.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Register the request with the host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Canceled`] without calling the host when the
    /// request's signal is already aborted, and after the `open` call when the
    /// signal fired while it was in flight. A rejected `open` is a transport
    /// error.
    pub async fn open(&self, request: FetchRequest) -> Result<Transfer, FetchError> {
        let signal = request.signal.clone();
        if signal.as_ref().is_some_and(|s| s.is_cancelled()) {
            tracing::debug!("signal aborted before open");
            return Err(FetchError::Canceled);
        }

        let url = request.url.clone();
        let conf = request.into_open_request(&self.default_headers);
        let ids = self.host.open(conf).await?;
        tracing::debug!(rid = ids.rid, txid = ids.txid, rxid = ids.rxid, "transfer opened");

        let notifier = CancelNotifier::new(self.host.clone(), ids.txid);
        if signal.as_ref().is_some_and(|s| s.is_cancelled()) {
            notifier.notify();
            return Err(FetchError::Canceled);
        }

        let guard = watch_signal(signal.as_ref(), &notifier);
        Ok(Transfer::new(
            self.host.clone(),
            ids,
            url,
            signal,
            notifier,
            guard,
        ))
    }

    /// Open the request and wait for the response head.
    ///
    /// The body is not read; see [`Response::into_body`].
    pub async fn fetch(&self, request: FetchRequest) -> Result<Response, FetchError> {
        let span = info_span!(
            "ipc.fetch",
            http.method = %request.method,
            url.full = %request.url,
            otel.kind = "client",
        );

        async move {
            let transfer = self.open(request).await?;
            transfer.await_headers().await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BODY_ID, MockHost, Script};
    use crate::{ErrorKind, RequestBody};
    use futures::StreamExt;
    use ipc_fetch_core::{NULL_BODY_STATUSES, TransferState, chunk_control, encode_chunk};
    use tokio_util::sync::CancellationToken;

    fn client(host: &Arc<MockHost>) -> IpcFetch {
        IpcFetch::new(host.clone())
    }

    #[tokio::test]
    async fn test_pre_aborted_signal_makes_no_calls() {
        let host = MockHost::new(Script::default().body(b"unused"));
        let signal = CancellationToken::new();
        signal.cancel();

        let err = client(&host)
            .fetch(FetchRequest::get("http://localhost/").signal(signal))
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert_eq!(err.to_string(), "Request cancelled");
        host.settle().await;
        assert_eq!(host.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_text_body() {
        let host = MockHost::new(
            Script::default()
                .header("content-type", "text/plain")
                .body(b"hello"),
        );
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.status_text(), "OK");
        assert!(response.ok());
        assert_eq!(response.url(), "http://localhost/");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.body_handle(), Some(BODY_ID));
        assert_eq!(response.text().await.unwrap(), "hello");
        assert_eq!(host.read_calls(), 1);
    }

    #[tokio::test]
    async fn test_head_only_never_reads_body() {
        let host = MockHost::new(Script::default().body(b"unread"));
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap();
        assert!(response.has_body());
        drop(response);

        host.settle().await;
        assert_eq!(host.send_calls(), 1);
        assert_eq!(host.read_calls(), 0);
    }

    #[tokio::test]
    async fn test_null_body_statuses_drop_handle() {
        for status in NULL_BODY_STATUSES {
            let host = MockHost::new(Script::default().status(status, "").body(b"ignored"));
            let response = client(&host)
                .fetch(FetchRequest::get("http://localhost/"))
                .await
                .unwrap();

            assert_eq!(response.status().as_u16(), status);
            assert_eq!(response.body_handle(), None, "status {status}");
            assert!(response.into_body().is_none());
        }
    }

    #[tokio::test]
    async fn test_open_request_on_the_wire() {
        let host = MockHost::new(Script::default().no_body());
        let client = IpcFetch::builder(host.clone())
            .default_header("x-app", "demo")
            .build();

        client
            .fetch(
                FetchRequest::post("http://localhost/post")
                    .header("x-app", "override")
                    .body(RequestBody::text("ping")),
            )
            .await
            .unwrap();

        let opened = host.open_calls();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].method, "POST");
        assert_eq!(opened[0].uri, "http://localhost/post");
        assert_eq!(opened[0].body.as_deref(), Some(&b"ping"[..]));
        assert!(
            opened[0]
                .headers
                .contains(&("x-app".to_string(), "override".to_string()))
        );
    }

    #[tokio::test]
    async fn test_open_rejection_is_transport_error() {
        let host = MockHost::new(Script::default().fail_open("invalid uri"));
        let err = client(&host)
            .fetch(FetchRequest::get("::"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.message(), "invalid uri");
        assert_eq!(host.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_send_rejected_with_sentinel_is_canceled() {
        let host = MockHost::new(Script::default().fail_send("Request cancelled"));
        let err = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
    }

    #[tokio::test]
    async fn test_abort_while_waiting_for_headers() {
        let host = MockHost::new(Script::default().hold_send());
        let signal = CancellationToken::new();
        let client = client(&host);

        let request = client.fetch(FetchRequest::get("http://localhost/").signal(signal.clone()));
        let abort = async {
            tokio::task::yield_now().await;
            signal.cancel();
        };
        let (result, ()) = tokio::join!(request, abort);

        assert!(result.unwrap_err().is_canceled());
        host.settle().await;
        assert_eq!(host.send_calls(), 1);
        assert_eq!(host.cancel_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_double_cancel_sends_one_notification() {
        let host = MockHost::new(Script::default().hold_body());
        let signal = CancellationToken::new();
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/").signal(signal.clone()))
            .await
            .unwrap();
        let mut body = response.into_body().unwrap();
        assert!(futures::poll!(body.next()).is_pending());

        signal.cancel();
        signal.cancel();
        host.settle().await;

        assert!(body.next().await.unwrap().unwrap_err().is_canceled());
        host.settle().await;
        assert_eq!(host.cancel_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_three_chunks_two_data_then_close() {
        let host = MockHost::new(Script::default().chunks(vec![
            encode_chunk(b"a", chunk_control::DATA),
            encode_chunk(b"b", chunk_control::DATA),
            encode_chunk(b"", chunk_control::END),
        ]));
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap();
        let mut body = response.into_body().unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = body.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks, vec!["a", "b"]);
        assert_eq!(body.state(), TransferState::Closed);
    }

    #[tokio::test]
    async fn test_json_helper_decode_error() {
        let host = MockHost::new(Script::default().body(b"not json"));
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap();
        let err = response.json::<serde_json::Value>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_bodyless_bytes_are_empty() {
        let host = MockHost::new(Script::default().status(204, "No Content"));
        let response = client(&host)
            .fetch(FetchRequest::get("http://localhost/"))
            .await
            .unwrap();
        assert!(response.bytes().await.unwrap().is_empty());
        assert_eq!(host.read_calls(), 0);
    }
}
