use std::time::Duration;

use futures::StreamExt;
use ipc_fetch::{CancellationToken, FetchError, FetchRequest, TransferState};

use crate::report::{CaseResult, finish};
use crate::server::{connect, expect_no_leaks, url};

pub async fn run() -> anyhow::Result<()> {
    let cases = vec![
        CaseResult::new("aborted before open", before_open().await),
        CaseResult::new("aborted while waiting for headers", during_send().await),
        CaseResult::new("aborted mid-stream", mid_stream().await),
        CaseResult::new("abort after completion", after_completion().await),
    ];
    finish("Cancellation", cases)
}

fn expect_canceled<T>(result: Result<T, FetchError>) -> anyhow::Result<()> {
    match result {
        Err(FetchError::Canceled) => Ok(()),
        Err(e) => anyhow::bail!("expected cancellation, got {e}"),
        Ok(_) => anyhow::bail!("expected cancellation, got a response"),
    }
}

fn cancel_after(signal: &CancellationToken, delay: Duration) {
    let signal = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        signal.cancel();
    });
}

async fn before_open() -> anyhow::Result<()> {
    let (host, client) = connect();
    let signal = CancellationToken::new();
    signal.cancel();

    expect_canceled(client.fetch(FetchRequest::get(url("/")).signal(signal)).await)?;
    anyhow::ensure!(host.resource_count() == 0, "host was called");
    Ok(())
}

async fn during_send() -> anyhow::Result<()> {
    let (host, client) = connect();
    let signal = CancellationToken::new();
    cancel_after(&signal, Duration::from_millis(50));

    let started = tokio::time::Instant::now();
    expect_canceled(client.fetch(FetchRequest::get(url("/slow")).signal(signal)).await)?;
    anyhow::ensure!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation took {:?}",
        started.elapsed()
    );
    expect_no_leaks(&host).await
}

async fn mid_stream() -> anyhow::Result<()> {
    let (host, client) = connect();
    let signal = CancellationToken::new();
    let response = client
        .fetch(FetchRequest::get(url("/endless")).signal(signal.clone()))
        .await?;
    let mut body = response
        .into_body()
        .ok_or_else(|| anyhow::anyhow!("expected a body"))?;

    for _ in 0..2 {
        body.next()
            .await
            .ok_or_else(|| anyhow::anyhow!("stream ended early"))??;
    }
    signal.cancel();

    loop {
        match body.next().await {
            Some(Ok(_)) => continue,
            Some(Err(FetchError::Canceled)) => break,
            Some(Err(e)) => anyhow::bail!("expected cancellation, got {e}"),
            None => anyhow::bail!("stream closed instead of erroring"),
        }
    }
    anyhow::ensure!(body.state() == TransferState::Cancelled, "state {:?}", body.state());
    drop(body);
    expect_no_leaks(&host).await
}

async fn after_completion() -> anyhow::Result<()> {
    let (host, client) = connect();
    let signal = CancellationToken::new();
    let text = client
        .fetch(FetchRequest::get(url("/")).signal(signal.clone()))
        .await?
        .text()
        .await?;
    anyhow::ensure!(text == "Hello, World!");

    signal.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;
    expect_no_leaks(&host).await
}
