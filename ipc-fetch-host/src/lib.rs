//! In-process host for `ipc-fetch` transfers.
//!
//! [`RouterHost`] implements [`HostRpc`] by dispatching each transfer to an
//! [`axum::Router`] without a socket in between. It is the reference host the
//! client crate is exercised against, and a drop-in host for applications
//! that embed their HTTP handlers in the same process.
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use ipc_fetch::{FetchRequest, IpcFetch};
//! use ipc_fetch_host::RouterHost;
//!
//! let router = Router::new().route("/", get(|| async { "Hello, World!" }));
//! let client = IpcFetch::new(RouterHost::new(router));
//! let text = client.fetch(FetchRequest::get("http://localhost/")).await?.text().await?;
//! ```

mod table;

use axum::Router;
use axum::body::Body;
use futures::future::BoxFuture;
use http::{HeaderName, HeaderValue, Method, Request, Uri};
use http_body_util::BodyExt;
use ipc_fetch_core::{
    ChunkSender, HostRpc, OpenRequest, ResourceId, ResponseMeta, RpcError, TransferIds,
    data_chunk, end_of_stream, is_null_body_status,
};
use tower::ServiceExt;
use tracing::debug;

use table::ResourceTable;

/// A [`HostRpc`] backed by an axum [`Router`].
pub struct RouterHost {
    router: Router,
    table: ResourceTable,
}

impl RouterHost {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            table: ResourceTable::default(),
        }
    }

    /// Number of live resources. Zero once every transfer has finished.
    pub fn resource_count(&self) -> usize {
        self.table.len()
    }

    fn build_request(conf: OpenRequest) -> Request<Body> {
        let mut request = Request::new(conf.body.map(Body::from).unwrap_or_else(Body::empty));
        *request.method_mut() = Method::from_bytes(conf.method.as_bytes()).unwrap_or(Method::GET);
        *request.uri_mut() = conf
            .uri
            .parse::<Uri>()
            .unwrap_or_else(|_| Uri::from_static("/"));

        let headers = request.headers_mut();
        for (name, value) in conf.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!(header = %name, "dropping invalid request header"),
            }
        }
        request
    }

    async fn pump_body(
        &self,
        bodyid: ResourceId,
        rxid: ResourceId,
        channel: ChunkSender,
    ) -> Result<(), RpcError> {
        let mut body = self.table.take_body(bodyid)?;
        let abort = self.table.take_abort_watch(rxid)?;

        let pump = async {
            while let Some(frame) = body.frame().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(err) => {
                        debug!(bodyid, error = %err, "body frame failed");
                        break;
                    }
                };
                let Ok(data) = frame.into_data() else {
                    continue;
                };
                if channel.send(data_chunk(&data)).is_err() {
                    debug!(bodyid, "chunk receiver discarded");
                    break;
                }
            }
            let _ = channel.send(end_of_stream());
        };

        tokio::select! {
            biased;
            _ = abort.cancelled() => {
                debug!(bodyid, "body read aborted");
                Err(RpcError::canceled())
            }
            _ = pump => Ok(()),
        }
    }
}

impl std::fmt::Debug for RouterHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterHost")
            .field("resources", &self.table.len())
            .finish_non_exhaustive()
    }
}

impl HostRpc for RouterHost {
    fn open(&self, conf: OpenRequest) -> BoxFuture<'_, Result<TransferIds, RpcError>> {
        Box::pin(async move {
            let request = Self::build_request(conf);
            debug!(method = %request.method(), uri = %request.uri(), "open");

            let router = self.router.clone();
            let pending = Box::pin(async move {
                match router.oneshot(request).await {
                    Ok(response) => response,
                    Err(infallible) => match infallible {},
                }
            });
            let (rid, txid, rxid) = self.table.add_transfer(pending);
            Ok(TransferIds { rid, txid, rxid })
        })
    }

    fn send(&self, ids: TransferIds) -> BoxFuture<'_, Result<ResponseMeta, RpcError>> {
        Box::pin(async move {
            let pending = self.table.take_request(ids.rid)?;
            let abort = self.table.abort_watch(ids.rxid)?;

            let response = tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    debug!(rid = ids.rid, "send aborted");
                    self.table.close(&[ids.rid, ids.txid, ids.rxid]);
                    return Err(RpcError::canceled());
                }
                response = pending => response,
            };

            let (parts, body) = response.into_parts();
            let status = parts.status.as_u16();
            let headers = parts
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        value.to_str().unwrap_or_default().to_owned(),
                    )
                })
                .collect();

            let bodyid = if is_null_body_status(status) {
                self.table.close(&[ids.txid, ids.rxid]);
                None
            } else {
                Some(self.table.add_body(body))
            };
            self.table.close(&[ids.rid]);
            debug!(rid = ids.rid, status, ?bodyid, "send complete");

            Ok(ResponseMeta {
                status,
                status_text: parts.status.canonical_reason().unwrap_or("").to_owned(),
                headers,
                bodyid,
            })
        })
    }

    fn read_body(
        &self,
        bodyid: ResourceId,
        rxid: ResourceId,
        txid: ResourceId,
        channel: ChunkSender,
    ) -> BoxFuture<'_, Result<(), RpcError>> {
        Box::pin(async move {
            let result = self.pump_body(bodyid, rxid, channel).await;
            self.table.close(&[bodyid, rxid, txid]);
            result
        })
    }

    fn cancel(&self, txid: ResourceId) -> BoxFuture<'_, Result<(), RpcError>> {
        Box::pin(async move {
            let trigger = self.table.take_abort_trigger(txid)?;
            debug!(txid, rid = trigger.rid, rxid = trigger.rxid, "cancel");
            trigger.token.cancel();
            // calls already observing the abort hold their own handles
            self.table.close(&[trigger.rid, trigger.rxid]);
            Ok(())
        })
    }
}
