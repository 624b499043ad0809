//! Transfer lifecycle.

/// Phase of a single request/response exchange.
///
/// ```text
/// Idle -> Opened -> HeadersReceived -> Streaming -> {Closed | Cancelled | Errored}
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Opened,
    HeadersReceived,
    Streaming,
    Closed,
    Cancelled,
    Errored,
}

impl TransferState {
    /// Get the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Idle => "idle",
            TransferState::Opened => "opened",
            TransferState::HeadersReceived => "headers_received",
            TransferState::Streaming => "streaming",
            TransferState::Closed => "closed",
            TransferState::Cancelled => "cancelled",
            TransferState::Errored => "errored",
        }
    }

    /// Returns whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Closed | TransferState::Cancelled | TransferState::Errored
        )
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
