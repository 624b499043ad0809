//! RPC substrate error type.
//!
//! Every call made through a [`HostRpc`](crate::HostRpc) either succeeds or
//! rejects with an [`RpcError`] carrying the host's message. Cancellation is not
//! a separate variant on the wire: it is recognised by message.

use serde::{Deserialize, Serialize};

/// Message used by clients to signal that a request was cancelled.
pub const CANCELLED_MESSAGE: &str = "Request cancelled";

/// Message reported by hosts when an in-flight transfer was aborted.
pub const HOST_CANCELED_MESSAGE: &str = "request canceled";

/// A rejected RPC call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
#[serde(transparent)]
pub struct RpcError {
    message: String,
}

impl RpcError {
    /// Create a new error with the given message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error reported by a host when a transfer was aborted.
    pub fn canceled() -> Self {
        Self::new(HOST_CANCELED_MESSAGE)
    }

    /// Error for a resource id that is unknown or already consumed.
    pub fn invalid_resource(id: crate::ResourceId) -> Self {
        Self::new(format!("resource id {id} is invalid"))
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether the message matches one of the cancellation sentinels.
    ///
    /// ```
    /// use ipc_fetch_core::RpcError;
    ///
    /// assert!(RpcError::new("Request cancelled").is_cancellation());
    /// assert!(RpcError::canceled().is_cancellation());
    /// assert!(!RpcError::new("connection reset").is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        is_cancellation_message(&self.message)
    }
}

/// Check whether a message is one of the cancellation sentinels.
pub fn is_cancellation_message(message: &str) -> bool {
    message == CANCELLED_MESSAGE || message == HOST_CANCELED_MESSAGE
}
