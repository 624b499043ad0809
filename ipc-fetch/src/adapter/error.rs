//! Adapter error types.
//!
//! This module provides [`AdapterError`], which carries the axios error code,
//! the configuration that failed and, for response failures, a snapshot of the
//! request that was sent.

use bytes::Bytes;
use http::Method;

use super::config::AdapterConfig;
use super::headers::HeaderObject;
use crate::error::FetchError;

/// Axios error codes produced by the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterErrorCode {
    /// The request was cancelled by its signal, cancel token, or timeout.
    Canceled,
    /// The request failed before a response head arrived.
    BadRequest,
    /// The response body could not be read into the requested representation.
    BadResponse,
}

impl AdapterErrorCode {
    /// The axios code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterErrorCode::Canceled => "ERR_CANCELED",
            AdapterErrorCode::BadRequest => "ERR_BAD_REQUEST",
            AdapterErrorCode::BadResponse => "ERR_BAD_RESPONSE",
        }
    }
}

impl std::fmt::Display for AdapterErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request as it was handed to the transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub url: String,
    pub method: Method,
    /// Headers as sent, after client defaults and the body's content type.
    pub headers: HeaderObject,
    /// The payload carried by `open`, if any.
    pub body: Option<Bytes>,
}

/// Error returned by [`HttpAdapter::request`](super::HttpAdapter::request).
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct AdapterError {
    code: AdapterErrorCode,
    message: String,
    config: Box<AdapterConfig>,
    request: Option<RequestSnapshot>,
    #[source]
    source: FetchError,
}

impl AdapterError {
    /// A failure before the response head arrived.
    pub(crate) fn request_failed(err: FetchError, config: AdapterConfig) -> Self {
        let code = if err.is_canceled() {
            AdapterErrorCode::Canceled
        } else {
            AdapterErrorCode::BadRequest
        };
        Self {
            code,
            message: err.message().to_owned(),
            config: Box::new(config),
            request: None,
            source: err,
        }
    }

    /// A failure while materializing the response body.
    pub(crate) fn bad_response(
        err: FetchError,
        config: AdapterConfig,
        request: RequestSnapshot,
    ) -> Self {
        let code = if err.is_canceled() {
            AdapterErrorCode::Canceled
        } else {
            AdapterErrorCode::BadResponse
        };
        Self {
            code,
            message: err.message().to_owned(),
            config: Box::new(config),
            request: Some(request),
            source: err,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> AdapterErrorCode {
        self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the configuration of the failed request.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Get the request snapshot, present for response failures.
    pub fn request(&self) -> Option<&RequestSnapshot> {
        self.request.as_ref()
    }

    /// Get the underlying transfer error.
    pub fn fetch_error(&self) -> &FetchError {
        &self.source
    }

    /// Returns whether the request was cancelled.
    pub fn is_canceled(&self) -> bool {
        self.code == AdapterErrorCode::Canceled
    }
}
