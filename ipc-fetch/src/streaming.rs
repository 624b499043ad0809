//! Pull-based response body stream.
//!
//! The host pushes chunk messages onto a channel; [`BodyStream`] turns them
//! back into a [`Stream`] of byte chunks that the consumer pulls at its own
//! pace.
//!
//! # Laziness
//!
//! No RPC activity happens until the stream is first polled. Callers that only
//! look at the status and headers never pay for a `read_body` call.
//!
//! # Buffering
//!
//! The host is not flow controlled. Chunks that arrive faster than the
//! consumer pulls them are queued without bound until pulled or until the
//! stream is dropped.
//!
//! # Cancellation
//!
//! If the request signal fires, the next poll fails with
//! [`FetchError::Canceled`] and the stream moves to
//! [`TransferState::Cancelled`], which is distinct from a clean close.
//! Dropping the stream discards the channel, which tells the host to stop
//! pushing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use futures::future::BoxFuture;
use ipc_fetch_core::{
    Chunk, ChunkReceiver, EndCode, HostRpc, ResourceId, RpcError, TransferIds, TransferState,
    chunk_channel, decode_chunk,
};
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFutureOwned};

use crate::error::FetchError;
use crate::transfer::{CancelNotifier, TransferGuard};

/// In-flight `read_body` call together with the channel it pushes onto.
struct Reading {
    rx: ChunkReceiver,
    read: Option<BoxFuture<'static, Result<(), RpcError>>>,
    channel_closed: bool,
}

enum ReadState {
    /// Not polled yet.
    Idle,
    Reading(Reading),
    Done(TransferState),
}

/// Outcome of one poll over the reading state.
enum Step {
    Start,
    Yield(Bytes),
    End(EndCode),
    Fail(FetchError),
    Cancel,
    Continue,
    Pending,
}

impl Reading {
    fn poll_step(
        &mut self,
        cx: &mut Context<'_>,
        signal: Option<&CancellationToken>,
        cancelled: Option<&mut Pin<Box<WaitForCancellationFutureOwned>>>,
    ) -> Step {
        if !self.channel_closed {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(message)) => {
                    if signal.is_some_and(|s| s.is_cancelled()) {
                        return Step::Cancel;
                    }
                    return match decode_chunk(message) {
                        Ok(Chunk::Data(bytes)) => Step::Yield(bytes),
                        Ok(Chunk::End(code)) => Step::End(code),
                        Err(e) => Step::Fail(e.into()),
                    };
                }
                Poll::Ready(None) => self.channel_closed = true,
                Poll::Pending => {}
            }
        }

        if let Some(cancelled) = cancelled {
            if cancelled.as_mut().poll(cx).is_ready() {
                return Step::Cancel;
            }
        }

        match self.read.as_mut() {
            Some(read) => match read.as_mut().poll(cx) {
                Poll::Ready(Ok(())) => {
                    self.read = None;
                    if self.channel_closed {
                        Step::Fail(premature_end())
                    } else {
                        Step::Continue
                    }
                }
                Poll::Ready(Err(e)) => Step::Fail(e.into()),
                Poll::Pending => Step::Pending,
            },
            None if self.channel_closed => Step::Fail(premature_end()),
            None => Step::Pending,
        }
    }
}

fn premature_end() -> FetchError {
    FetchError::Transport("body channel closed before end of stream".into())
}

/// Streaming response body.
///
/// Yields the payload of every data chunk in order and ends after a terminal
/// chunk. See the [module docs](self) for laziness and cancellation.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
///
/// let response = client.fetch(FetchRequest::get("http://localhost/stream-body")).await?;
/// let mut body = response.into_body().expect("response has a body");
///
/// while let Some(chunk) = body.next().await {
///     println!("got {} bytes", chunk?.len());
/// }
/// ```
pub struct BodyStream {
    host: Arc<dyn HostRpc>,
    bodyid: ResourceId,
    ids: TransferIds,
    signal: Option<CancellationToken>,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    notifier: CancelNotifier,
    state: ReadState,
    end_code: Option<EndCode>,
    guard: Option<TransferGuard>,
    linked: Option<DropGuard>,
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("bodyid", &self.bodyid)
            .field("ids", &self.ids)
            .field("state", &self.state())
            .field("end_code", &self.end_code)
            .finish_non_exhaustive()
    }
}

impl BodyStream {
    pub(crate) fn new(
        host: Arc<dyn HostRpc>,
        bodyid: ResourceId,
        ids: TransferIds,
        signal: Option<CancellationToken>,
        notifier: CancelNotifier,
        guard: TransferGuard,
    ) -> Self {
        Self {
            host,
            bodyid,
            ids,
            signal,
            cancelled: None,
            notifier,
            state: ReadState::Idle,
            end_code: None,
            guard: Some(guard),
            linked: None,
        }
    }

    /// Keep `guard` alive until the stream ends or is dropped.
    pub(crate) fn link(&mut self, guard: DropGuard) {
        self.linked = Some(guard);
    }

    /// The host's handle for this body.
    pub fn body_handle(&self) -> ResourceId {
        self.bodyid
    }

    /// Current phase. [`TransferState::HeadersReceived`] until first polled.
    pub fn state(&self) -> TransferState {
        match &self.state {
            ReadState::Idle => TransferState::HeadersReceived,
            ReadState::Reading(_) => TransferState::Streaming,
            ReadState::Done(state) => *state,
        }
    }

    /// The terminal code that closed the stream, once closed.
    pub fn end_code(&self) -> Option<EndCode> {
        self.end_code
    }

    /// Returns whether the `read_body` call has been issued.
    pub fn is_started(&self) -> bool {
        !matches!(self.state, ReadState::Idle)
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes, FetchError> {
        use futures::StreamExt;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    fn start(&mut self) {
        let (tx, rx) = chunk_channel();
        let host = self.host.clone();
        let (bodyid, rxid, txid) = (self.bodyid, self.ids.rxid, self.ids.txid);
        tracing::debug!(bodyid, txid, "reading body");

        let read: BoxFuture<'static, Result<(), RpcError>> =
            Box::pin(async move { host.read_body(bodyid, rxid, txid, tx).await });
        self.cancelled = self
            .signal
            .as_ref()
            .map(|s| Box::pin(s.clone().cancelled_owned()));
        self.state = ReadState::Reading(Reading {
            rx,
            read: Some(read),
            channel_closed: false,
        });
    }

    /// Enter a terminal state, dropping the channel and the abort listener.
    fn finish(&mut self, state: TransferState) {
        self.state = ReadState::Done(state);
        self.cancelled = None;
        self.guard = None;
        self.linked = None;
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, FetchError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let step = match &mut this.state {
                ReadState::Done(_) => return Poll::Ready(None),
                ReadState::Idle => Step::Start,
                ReadState::Reading(reading) => {
                    reading.poll_step(cx, this.signal.as_ref(), this.cancelled.as_mut())
                }
            };

            match step {
                Step::Start => {
                    if this.signal.as_ref().is_some_and(|s| s.is_cancelled()) {
                        this.notifier.notify();
                        this.finish(TransferState::Cancelled);
                        return Poll::Ready(Some(Err(FetchError::Canceled)));
                    }
                    this.start();
                }
                Step::Yield(bytes) => return Poll::Ready(Some(Ok(bytes))),
                Step::End(code) => {
                    tracing::debug!(bodyid = this.bodyid, ?code, "body stream closed");
                    this.end_code = Some(code);
                    this.finish(TransferState::Closed);
                    return Poll::Ready(None);
                }
                Step::Cancel => {
                    tracing::debug!(bodyid = this.bodyid, "body stream cancelled");
                    this.notifier.notify();
                    this.finish(TransferState::Cancelled);
                    return Poll::Ready(Some(Err(FetchError::Canceled)));
                }
                Step::Fail(e) => {
                    tracing::debug!(bodyid = this.bodyid, error = %e, "body stream failed");
                    let state = if e.is_canceled() {
                        TransferState::Cancelled
                    } else {
                        TransferState::Errored
                    };
                    this.finish(state);
                    return Poll::Ready(Some(Err(e)));
                }
                Step::Continue => {}
                Step::Pending => return Poll::Pending,
            }
        }
    }
}
