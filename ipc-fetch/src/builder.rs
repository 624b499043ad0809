//! Client builder.
//!
//! Provides a fluent API for configuring and building an [`IpcFetch`].

use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};
use ipc_fetch_core::HostRpc;

use crate::client::IpcFetch;

/// Builder for creating an [`IpcFetch`].
///
/// # Example
///
/// ```ignore
/// use ipc_fetch::ClientBuilder;
///
/// let client = ClientBuilder::new(host)
///     .default_header("x-app", "demo")
///     .build();
/// ```
pub struct ClientBuilder {
    /// The RPC substrate every transfer runs over.
    host: Arc<dyn HostRpc>,
    /// Headers applied to every request that does not set them.
    default_headers: HeaderMap,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder over `host`.
    pub fn new<H: HostRpc>(host: H) -> Self {
        Self::from_arc(Arc::new(host))
    }

    /// Create a builder over an already shared host.
    pub fn from_arc(host: Arc<dyn HostRpc>) -> Self {
        Self {
            host,
            default_headers: HeaderMap::new(),
        }
    }

    /// Add a default header. Invalid names or values are ignored.
    pub fn default_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.default_headers.insert(name, value);
        }
        self
    }

    /// Replace the default headers.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Build the client.
    pub fn build(self) -> IpcFetch {
        IpcFetch::from_parts(self.host, self.default_headers)
    }
}
