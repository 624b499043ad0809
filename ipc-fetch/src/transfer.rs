//! A single request/response exchange.
//!
//! A [`Transfer`] is produced by [`IpcFetch::open`](crate::IpcFetch::open)
//! once the host has registered the request. Awaiting its headers issues the
//! `send` call; the body is read later, and lazily, through
//! [`BodyStream`](crate::BodyStream).
//!
//! # Cancellation
//!
//! When the request carries a signal, opening the transfer spawns a listener
//! that sends one `cancel` call to the host if the signal fires. The listener
//! lives as long as the transfer, its response, or its body stream, whichever
//! is last.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use ipc_fetch_core::{HostRpc, ResourceId, ResponseMeta, TransferIds, TransferState, is_null_body_status};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::FetchError;
use crate::response::Response;
use crate::streaming::BodyStream;

/// Sends at most one `cancel` call per transfer.
#[derive(Clone)]
pub(crate) struct CancelNotifier {
    host: Arc<dyn HostRpc>,
    txid: ResourceId,
    sent: Arc<AtomicBool>,
}

impl CancelNotifier {
    pub(crate) fn new(host: Arc<dyn HostRpc>, txid: ResourceId) -> Self {
        Self {
            host,
            txid,
            sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fire-and-forget cancel. Later calls are no-ops.
    pub(crate) fn notify(&self) {
        if self.sent.swap(true, Ordering::AcqRel) {
            return;
        }
        let host = self.host.clone();
        let txid = self.txid;
        tracing::debug!(txid, "sending cancel notification");
        tokio::spawn(async move {
            if let Err(e) = host.cancel(txid).await {
                tracing::debug!(txid, error = %e, "cancel notification failed");
            }
        });
    }
}

/// Tears the abort listener down when dropped.
#[derive(Debug)]
pub(crate) struct TransferGuard {
    _guard: DropGuard,
}

/// Spawn the abort listener for a transfer.
pub(crate) fn watch_signal(signal: Option<&CancellationToken>, notifier: &CancelNotifier) -> TransferGuard {
    let done = CancellationToken::new();
    if let Some(signal) = signal {
        let signal = signal.clone();
        let notifier = notifier.clone();
        let finished = done.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = signal.cancelled() => notifier.notify(),
                _ = finished.cancelled() => {}
            }
        });
    }
    TransferGuard {
        _guard: done.drop_guard(),
    }
}

/// An opened transfer, waiting for its response head.
pub struct Transfer {
    host: Arc<dyn HostRpc>,
    ids: TransferIds,
    url: String,
    signal: Option<CancellationToken>,
    notifier: CancelNotifier,
    guard: TransferGuard,
}

impl std::fmt::Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("ids", &self.ids)
            .field("url", &self.url)
            .field("signal", &self.signal.is_some())
            .finish_non_exhaustive()
    }
}

impl Transfer {
    pub(crate) fn new(
        host: Arc<dyn HostRpc>,
        ids: TransferIds,
        url: String,
        signal: Option<CancellationToken>,
        notifier: CancelNotifier,
        guard: TransferGuard,
    ) -> Self {
        Self {
            host,
            ids,
            url,
            signal,
            notifier,
            guard,
        }
    }

    /// The identifiers assigned by the host.
    pub fn ids(&self) -> TransferIds {
        self.ids
    }

    /// The request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Always [`TransferState::Opened`]; later phases are owned by
    /// [`Response`] and [`BodyStream`].
    pub fn state(&self) -> TransferState {
        TransferState::Opened
    }

    fn aborted(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.is_cancelled())
    }

    fn cancel(&self) -> FetchError {
        self.notifier.notify();
        FetchError::Canceled
    }

    /// Issue the `send` call and wait for the status line and headers.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Canceled`] if the signal fires before or while
    /// the call is in flight; a late result is discarded. Other call failures
    /// are transport errors.
    pub async fn await_headers(self) -> Result<Response, FetchError> {
        if self.aborted() {
            return Err(self.cancel());
        }

        let result = match &self.signal {
            Some(signal) => {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => return Err(self.cancel()),
                    result = self.host.send(self.ids) => result,
                }
            }
            None => self.host.send(self.ids).await,
        };

        if self.aborted() {
            return Err(self.cancel());
        }
        let meta = result?;
        tracing::debug!(status = meta.status, bodyid = ?meta.bodyid, "headers received");
        self.into_response(meta)
    }

    fn into_response(self, meta: ResponseMeta) -> Result<Response, FetchError> {
        let status = StatusCode::from_u16(meta.status)
            .map_err(|_| FetchError::Transport(format!("invalid status code: {}", meta.status)))?;
        let headers = header_map(meta.headers);

        let bodyid = meta.bodyid.filter(|_| !is_null_body_status(meta.status));
        let (body, guard) = match bodyid {
            Some(bodyid) => {
                let stream = BodyStream::new(
                    self.host,
                    bodyid,
                    self.ids,
                    self.signal,
                    self.notifier,
                    self.guard,
                );
                (Some(stream), None)
            }
            None => (None, Some(self.guard)),
        };

        Ok(Response::new(
            self.url,
            status,
            meta.status_text,
            headers,
            body,
            guard,
        ))
    }
}

/// Rebuild a header map; a later value for the same name replaces earlier ones.
fn header_map(pairs: Vec<(String, String)>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping invalid response header"),
        }
    }
    headers
}
