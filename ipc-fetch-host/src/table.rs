//! Resource table shared by the host calls.
//!
//! Every open transfer owns four kinds of entries: the parked request future
//! (`rid`), the abort trigger (`txid`), the abort watcher (`rxid`), and, once
//! the response head is back, the response body (`bodyid`).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use axum::body::Body;
use axum::response::Response;
use futures::future::BoxFuture;
use ipc_fetch_core::{ResourceId, RpcError};
use tokio_util::sync::CancellationToken;

pub(crate) type PendingRequest = BoxFuture<'static, Response>;

/// Send side of a transfer's abort pair.
pub(crate) struct AbortTrigger {
    pub(crate) token: CancellationToken,
    /// The parked request of the same transfer.
    pub(crate) rid: ResourceId,
    /// The watcher paired with this trigger.
    pub(crate) rxid: ResourceId,
}

enum Resource {
    Request(PendingRequest),
    AbortTrigger(AbortTrigger),
    AbortWatch(CancellationToken),
    Body(Body),
}

impl Resource {
    fn kind(&self) -> &'static str {
        match self {
            Resource::Request(_) => "request",
            Resource::AbortTrigger(_) => "abort trigger",
            Resource::AbortWatch(_) => "abort watch",
            Resource::Body(_) => "body",
        }
    }
}

#[derive(Default)]
struct Entries {
    next_id: ResourceId,
    resources: HashMap<ResourceId, Resource>,
}

impl Entries {
    fn add(&mut self, resource: Resource) -> ResourceId {
        self.next_id = self.next_id.wrapping_add(1);
        while self.next_id == 0 || self.resources.contains_key(&self.next_id) {
            self.next_id = self.next_id.wrapping_add(1);
        }
        self.resources.insert(self.next_id, resource);
        self.next_id
    }
}

/// Id-keyed storage for in-flight transfer state.
#[derive(Default)]
pub(crate) struct ResourceTable {
    entries: Mutex<Entries>,
}

macro_rules! take_as {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub(crate) fn $name(&self, id: ResourceId) -> Result<$ty, RpcError> {
            let mut entries = self.lock();
            match entries.resources.remove(&id) {
                Some(Resource::$variant(value)) => Ok(value),
                Some(other) => {
                    tracing::debug!(id, kind = other.kind(), "resource has the wrong kind");
                    entries.resources.insert(id, other);
                    Err(RpcError::invalid_resource(id))
                }
                None => Err(RpcError::invalid_resource(id)),
            }
        }
    };
}

impl ResourceTable {
    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a parked request and its abort pair. Returns `(rid, txid, rxid)`.
    pub(crate) fn add_transfer(
        &self,
        request: PendingRequest,
    ) -> (ResourceId, ResourceId, ResourceId) {
        let abort = CancellationToken::new();
        let mut entries = self.lock();
        let rid = entries.add(Resource::Request(request));
        let rxid = entries.add(Resource::AbortWatch(abort.clone()));
        let txid = entries.add(Resource::AbortTrigger(AbortTrigger {
            token: abort,
            rid,
            rxid,
        }));
        (rid, txid, rxid)
    }

    pub(crate) fn add_body(&self, body: Body) -> ResourceId {
        self.lock().add(Resource::Body(body))
    }

    /// A handle on the abort watcher, leaving it in the table.
    pub(crate) fn abort_watch(&self, rxid: ResourceId) -> Result<CancellationToken, RpcError> {
        match self.lock().resources.get(&rxid) {
            Some(Resource::AbortWatch(token)) => Ok(token.clone()),
            _ => Err(RpcError::invalid_resource(rxid)),
        }
    }

    take_as!(take_request, Request, PendingRequest);
    take_as!(take_abort_trigger, AbortTrigger, AbortTrigger);
    take_as!(take_abort_watch, AbortWatch, CancellationToken);
    take_as!(take_body, Body, Body);

    /// Drop the given ids, ignoring unknown ones.
    pub(crate) fn close(&self, ids: &[ResourceId]) {
        let mut entries = self.lock();
        for id in ids {
            entries.resources.remove(id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().resources.len()
    }
}
