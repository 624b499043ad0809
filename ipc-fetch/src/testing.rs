//! Scripted in-process host for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use ipc_fetch_core::{
    ChunkSender, HostRpc, OpenRequest, ResourceId, ResponseMeta, RpcError, TransferIds,
};
use tokio_util::sync::CancellationToken;

pub(crate) const BODY_ID: ResourceId = 7;

/// What the mock host answers.
#[derive(Clone)]
pub(crate) struct Script {
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    bodyid: Option<ResourceId>,
    chunks: Vec<Vec<u8>>,
    open_delay: Option<Duration>,
    hold_send: bool,
    hold_body: bool,
    open_error: Option<String>,
    send_error: Option<String>,
    read_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: "OK".into(),
            headers: Vec::new(),
            bodyid: Some(BODY_ID),
            chunks: Vec::new(),
            open_delay: None,
            hold_send: false,
            hold_body: false,
            open_error: None,
            send_error: None,
            read_error: None,
        }
    }
}

impl Script {
    pub(crate) fn status(mut self, status: u16, text: &str) -> Self {
        self.status = status;
        self.status_text = text.into();
        self
    }

    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub(crate) fn no_body(mut self) -> Self {
        self.bodyid = None;
        self
    }

    pub(crate) fn chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Body made of one data chunk followed by the end marker.
    pub(crate) fn body(self, payload: &[u8]) -> Self {
        self.chunks(vec![
            ipc_fetch_core::data_chunk(payload),
            ipc_fetch_core::end_of_stream(),
        ])
    }

    /// `open` registers the transfer, then answers after `delay`.
    pub(crate) fn delay_open(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// `send` never answers until cancelled.
    pub(crate) fn hold_send(mut self) -> Self {
        self.hold_send = true;
        self
    }

    /// `read_body` keeps the channel open; chunks come from [`MockHost::push_chunk`].
    pub(crate) fn hold_body(mut self) -> Self {
        self.hold_body = true;
        self
    }

    pub(crate) fn fail_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.into());
        self
    }

    pub(crate) fn fail_send(mut self, message: &str) -> Self {
        self.send_error = Some(message.into());
        self
    }

    pub(crate) fn fail_read(mut self, message: &str) -> Self {
        self.read_error = Some(message.into());
        self
    }
}

#[derive(Default)]
struct Calls {
    opened: Vec<OpenRequest>,
    sends: usize,
    reads: usize,
    cancels: Vec<ResourceId>,
    held: Option<ChunkSender>,
}

pub(crate) struct MockHost {
    script: Script,
    calls: Mutex<Calls>,
    aborted: CancellationToken,
}

impl MockHost {
    pub(crate) fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: Mutex::new(Calls::default()),
            aborted: CancellationToken::new(),
        })
    }

    pub(crate) fn open_calls(&self) -> Vec<OpenRequest> {
        self.calls.lock().unwrap().opened.clone()
    }

    pub(crate) fn send_calls(&self) -> usize {
        self.calls.lock().unwrap().sends
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.calls.lock().unwrap().reads
    }

    pub(crate) fn cancel_calls(&self) -> Vec<ResourceId> {
        self.calls.lock().unwrap().cancels.clone()
    }

    pub(crate) fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.opened.len() + calls.sends + calls.reads + calls.cancels.len()
    }

    /// Push a message through the held body channel.
    pub(crate) fn push_chunk(&self, message: Vec<u8>) {
        let calls = self.calls.lock().unwrap();
        let sender = calls.held.as_ref().expect("read_body has not been called");
        let _ = sender.send(message);
    }

    /// Let spawned cancel notifications run.
    pub(crate) async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}

impl HostRpc for MockHost {
    fn open(&self, conf: OpenRequest) -> BoxFuture<'_, Result<TransferIds, RpcError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().opened.push(conf);
            if let Some(delay) = self.script.open_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(message) = &self.script.open_error {
                return Err(RpcError::new(message.clone()));
            }
            Ok(TransferIds { rid: 1, txid: 2, rxid: 3 })
        })
    }

    fn send(&self, _ids: TransferIds) -> BoxFuture<'_, Result<ResponseMeta, RpcError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().sends += 1;
            if self.script.hold_send {
                self.aborted.cancelled().await;
                return Err(RpcError::canceled());
            }
            if let Some(message) = &self.script.send_error {
                return Err(RpcError::new(message.clone()));
            }
            Ok(ResponseMeta {
                status: self.script.status,
                status_text: self.script.status_text.clone(),
                headers: self.script.headers.clone(),
                bodyid: self.script.bodyid,
            })
        })
    }

    fn read_body(
        &self,
        _bodyid: ResourceId,
        _rxid: ResourceId,
        _txid: ResourceId,
        channel: ChunkSender,
    ) -> BoxFuture<'_, Result<(), RpcError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().reads += 1;
            if let Some(message) = &self.script.read_error {
                return Err(RpcError::new(message.clone()));
            }
            for chunk in &self.script.chunks {
                if channel.send(chunk.clone()).is_err() {
                    return Ok(());
                }
            }
            if self.script.hold_body {
                self.calls.lock().unwrap().held = Some(channel);
                self.aborted.cancelled().await;
            }
            Ok(())
        })
    }

    fn cancel(&self, txid: ResourceId) -> BoxFuture<'_, Result<(), RpcError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().cancels.push(txid);
            self.aborted.cancel();
            Ok(())
        })
    }
}
