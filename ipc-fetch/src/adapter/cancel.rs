//! Axios-style cancel tokens.
//!
//! A [`CancelToken`] is a one-shot cancellation handle carrying a reason. The
//! adapter links it onto the request's cancellation signal for as long as the
//! transfer is alive.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::{CancellationToken, DropGuard};

/// A cancel token with an optional reason.
///
/// # Example
///
/// ```ignore
/// let token = CancelToken::new();
/// let pending = adapter.request(config.cancel_token(token.clone()));
///
/// token.cancel("user navigated away");
/// assert!(pending.await.unwrap_err().is_canceled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token and a function that cancels it.
    pub fn source() -> (Self, impl Fn(&str) + Send + Sync + 'static) {
        let token = Self::new();
        let canceller = token.clone();
        (token, move |reason: &str| canceller.cancel(reason))
    }

    /// Cancel the token. Only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    /// Returns whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason given to the first [`cancel`](Self::cancel) call.
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Cancel `signal` when this token is cancelled.
    ///
    /// An already cancelled token cancels `signal` immediately. Otherwise the
    /// link lasts until the returned guard is dropped.
    pub(crate) fn link(&self, signal: &CancellationToken) -> Option<DropGuard> {
        if self.is_cancelled() {
            signal.cancel();
            return None;
        }

        let done = CancellationToken::new();
        let token = self.token.clone();
        let signal = signal.clone();
        let finished = done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => signal.cancel(),
                _ = finished.cancelled() => {}
            }
        });
        Some(done.drop_guard())
    }
}
