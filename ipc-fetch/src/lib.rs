//! HTTP requests carried over a host process RPC channel.
//!
//! This crate runs HTTP-shaped requests through a [`HostRpc`] instead of a
//! socket. One logical exchange is a *transfer* made of sequential calls:
//!
//! 1. `open` registers the request and returns the transfer identifiers
//! 2. `send` executes it and returns the status line and headers
//! 3. `read_body` pushes the body back as chunk messages, only when the
//!    caller starts reading it
//!
//! A fire-and-forget `cancel` call is sent when the request's signal fires.
//!
//! ## Example
//!
//! ```ignore
//! use ipc_fetch::{FetchRequest, IpcFetch};
//! use futures::StreamExt;
//!
//! let client = IpcFetch::builder(host)
//!     .default_header("x-app", "demo")
//!     .build();
//!
//! let response = client.fetch(FetchRequest::get("http://localhost/stream-body")).await?;
//! println!("{} {}", response.status(), response.status_text());
//!
//! if let Some(mut body) = response.into_body() {
//!     while let Some(chunk) = body.next().await {
//!         println!("chunk: {:?}", chunk?);
//!     }
//! }
//! ```
//!
//! ## Cancellation
//!
//! Attach a [`CancellationToken`] with [`FetchRequest::signal`]. The token is
//! observed, never cancelled, by the transfer.
//!
//! - aborted before `open`: the request fails with [`FetchError::Canceled`]
//!   and the host is never called
//! - aborted while a call is in flight: its result is discarded, the request
//!   fails with [`FetchError::Canceled`] and the host receives one `cancel`
//! - aborted while the body is streaming: the [`BodyStream`] yields
//!   [`FetchError::Canceled`] instead of closing
//!
//! ## Axios Adapter
//!
//! The [`adapter`] module layers an axios-style request/response contract on
//! top of [`IpcFetch`], with timeouts, cancel tokens and response
//! materialization.
//!
//! ## Observability
//!
//! Each [`IpcFetch::fetch`] runs inside an `ipc.fetch` span with:
//! - `http.method`: the request method
//! - `url.full`: the request URL
//! - `otel.kind`: "client"

pub mod adapter;
mod builder;
mod client;
mod error;
mod request;
mod response;
mod streaming;
mod transfer;

#[cfg(test)]
mod testing;

pub use builder::ClientBuilder;
pub use client::IpcFetch;
pub use error::{ErrorKind, FetchError};
pub use request::{FetchRequest, RequestBody};
pub use response::Response;
pub use streaming::BodyStream;
pub use transfer::Transfer;

// Re-export the wire contract and the cancellation signal type
pub use ipc_fetch_core::{
    CANCELLED_MESSAGE, EndCode, HostRpc, ResourceId, RpcError, TransferIds, TransferState,
};
pub use tokio_util::sync::CancellationToken;
