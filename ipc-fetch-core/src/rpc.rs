//! The RPC substrate consumed by clients.
//!
//! A host exposes four calls. `open`, `send` and `cancel` are plain
//! request/response calls; `read_body` additionally receives a [`ChunkSender`]
//! and pushes chunk messages through it until the body ends or the receiver is
//! discarded.
//!
//! # Flow control
//!
//! The chunk channel is unbounded. A host pushes as fast as its body produces
//! data and the client buffers whatever the consumer has not pulled yet; there
//! is no signal back to the host to slow down.

use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::RpcError;
use crate::wire::{OpenRequest, ResourceId, ResponseMeta, TransferIds};

/// Calls exposed by a host process.
///
/// Implementations must be safe to share between concurrent transfers: each
/// transfer carries its own identifiers and no call locks the substrate.
pub trait HostRpc: Send + Sync + 'static {
    /// Register a request and return the identifiers of the new transfer.
    fn open(&self, conf: OpenRequest) -> BoxFuture<'_, Result<TransferIds, RpcError>>;

    /// Execute the request registered under `ids.rid` and return the response head.
    fn send(&self, ids: TransferIds) -> BoxFuture<'_, Result<ResponseMeta, RpcError>>;

    /// Push the body registered under `bodyid` onto `channel`.
    fn read_body(
        &self,
        bodyid: ResourceId,
        rxid: ResourceId,
        txid: ResourceId,
        channel: ChunkSender,
    ) -> BoxFuture<'_, Result<(), RpcError>>;

    /// Abort the transfer owning `txid`.
    fn cancel(&self, txid: ResourceId) -> BoxFuture<'_, Result<(), RpcError>>;
}

impl<T: HostRpc + ?Sized> HostRpc for Arc<T> {
    fn open(&self, conf: OpenRequest) -> BoxFuture<'_, Result<TransferIds, RpcError>> {
        (**self).open(conf)
    }

    fn send(&self, ids: TransferIds) -> BoxFuture<'_, Result<ResponseMeta, RpcError>> {
        (**self).send(ids)
    }

    fn read_body(
        &self,
        bodyid: ResourceId,
        rxid: ResourceId,
        txid: ResourceId,
        channel: ChunkSender,
    ) -> BoxFuture<'_, Result<(), RpcError>> {
        (**self).read_body(bodyid, rxid, txid, channel)
    }

    fn cancel(&self, txid: ResourceId) -> BoxFuture<'_, Result<(), RpcError>> {
        (**self).cancel(txid)
    }
}

/// Returned by [`ChunkSender::send`] once the receiver has been discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("chunk channel closed")]
pub struct ChannelClosed;

/// Host side of the body channel.
#[derive(Clone, Debug)]
pub struct ChunkSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChunkSender {
    /// Push one chunk message.
    pub fn send(&self, message: impl Into<Bytes>) -> Result<(), ChannelClosed> {
        self.tx.send(message.into()).map_err(|_| ChannelClosed)
    }

    /// Returns whether the receiver has been discarded.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Client side of the body channel.
#[derive(Debug)]
pub struct ChunkReceiver {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ChunkReceiver {
    /// Receive the next message, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Poll for the next message.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }

    /// Stop accepting messages. Later sends fail with [`ChannelClosed`].
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Create a body channel.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChunkSender { tx }, ChunkReceiver { rx })
}
