use futures::StreamExt;
use ipc_fetch::{EndCode, FetchRequest, TransferState};

use crate::report::{CaseResult, finish};
use crate::server::{STREAM_LINES, connect, expect_no_leaks, url};

pub async fn run() -> anyhow::Result<()> {
    let cases = vec![
        CaseResult::new("chunks arrive in order", chunks_in_order().await),
        CaseResult::new("stream closes with end code", end_code().await),
        CaseResult::new("collect whole body", collect().await),
        CaseResult::new("concurrent transfers", concurrent().await),
    ];
    finish("Body Streaming", cases)
}

async fn chunks_in_order() -> anyhow::Result<()> {
    let (host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/stream-body"))).await?;
    let mut body = response
        .into_body()
        .ok_or_else(|| anyhow::anyhow!("expected a body"))?;

    let mut received = Vec::new();
    while let Some(chunk) = body.next().await {
        received.push(String::from_utf8(chunk?.to_vec())?);
    }
    anyhow::ensure!(received == STREAM_LINES, "unexpected chunks {received:?}");
    expect_no_leaks(&host).await
}

async fn end_code() -> anyhow::Result<()> {
    let (_host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/"))).await?;
    let mut body = response
        .into_body()
        .ok_or_else(|| anyhow::anyhow!("expected a body"))?;
    anyhow::ensure!(body.state() == TransferState::HeadersReceived);

    while let Some(chunk) = body.next().await {
        chunk?;
    }
    anyhow::ensure!(body.state() == TransferState::Closed, "state {:?}", body.state());
    anyhow::ensure!(body.end_code() == Some(EndCode::End), "end code {:?}", body.end_code());
    Ok(())
}

async fn collect() -> anyhow::Result<()> {
    let (host, client) = connect();
    let bytes = client
        .fetch(FetchRequest::get(url("/stream-body")))
        .await?
        .bytes()
        .await?;
    anyhow::ensure!(bytes == STREAM_LINES.concat().as_bytes(), "unexpected body {bytes:?}");
    expect_no_leaks(&host).await
}

async fn concurrent() -> anyhow::Result<()> {
    let (host, client) = connect();
    let requests = (0..8).map(|_| {
        let client = client.clone();
        async move {
            client
                .fetch(FetchRequest::get(url("/stream-body")))
                .await?
                .text()
                .await
        }
    });
    for text in futures::future::join_all(requests).await {
        anyhow::ensure!(text? == STREAM_LINES.concat());
    }
    expect_no_leaks(&host).await
}
