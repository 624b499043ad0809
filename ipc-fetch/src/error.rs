//! Client-side error types.
//!
//! This module provides [`FetchError`], the error type for transfers and
//! response materialization.

use ipc_fetch_core::{CANCELLED_MESSAGE, ChunkError, RpcError};

/// Broad classification of a [`FetchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The signal was aborted before or during the exchange.
    Canceled,
    /// An RPC call was rejected, or the host sent something malformed.
    Transport,
    /// The body could not be materialized into the requested representation.
    Decode,
    /// The caller asked for something this client does not support.
    Config,
}

/// Errors produced while running a transfer or reading its body.
#[derive(Clone, Debug, thiserror::Error)]
pub enum FetchError {
    /// The request was cancelled.
    #[error("{}", CANCELLED_MESSAGE)]
    Canceled,

    /// An RPC call failed for a reason other than cancellation.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Unknown response representation.
    #[error("Response type unsupported: {0}")]
    UnsupportedResponseType(String),
}

impl FetchError {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Canceled => ErrorKind::Canceled,
            FetchError::Transport(_) => ErrorKind::Transport,
            FetchError::Decode(_) => ErrorKind::Decode,
            FetchError::UnsupportedResponseType(_) => ErrorKind::Config,
        }
    }

    /// Get the underlying message.
    pub fn message(&self) -> &str {
        match self {
            FetchError::Canceled => CANCELLED_MESSAGE,
            FetchError::Transport(msg)
            | FetchError::Decode(msg)
            | FetchError::UnsupportedResponseType(msg) => msg,
        }
    }

    /// Returns whether this error is a cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

impl From<RpcError> for FetchError {
    fn from(err: RpcError) -> Self {
        if err.is_cancellation() {
            FetchError::Canceled
        } else {
            FetchError::Transport(err.message().to_owned())
        }
    }
}

impl From<ChunkError> for FetchError {
    fn from(err: ChunkError) -> Self {
        FetchError::Transport(format!("malformed chunk: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_reclassified_as_canceled() {
        let err = FetchError::from(RpcError::new("Request cancelled"));
        assert!(err.is_canceled());
        assert_eq!(err.kind(), ErrorKind::Canceled);

        let err = FetchError::from(RpcError::canceled());
        assert!(err.is_canceled());
    }

    #[test]
    fn test_rpc_error_maps_to_transport() {
        let err = FetchError::from(RpcError::new("resource id 3 is invalid"));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.message(), "resource id 3 is invalid");
        assert_eq!(err.to_string(), "transport error: resource id 3 is invalid");
    }

    #[test]
    fn test_chunk_error_maps_to_transport() {
        let err = FetchError::from(ChunkError::Empty);
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(FetchError::Decode("x".into()).kind(), ErrorKind::Decode);
        assert_eq!(
            FetchError::UnsupportedResponseType("xml".into()).kind(),
            ErrorKind::Config
        );
        assert_eq!(FetchError::Canceled.to_string(), "Request cancelled");
    }
}
