use http::StatusCode;
use ipc_fetch::{FetchRequest, RequestBody};
use serde_json::json;

use crate::report::{CaseResult, finish};
use crate::server::{connect, expect_no_leaks, url};

pub async fn run() -> anyhow::Result<()> {
    let cases = vec![
        CaseResult::new("get text", get_text().await),
        CaseResult::new("post json", post_json().await),
        CaseResult::new("default and request headers", headers().await),
        CaseResult::new("no content has no body", no_content().await),
        CaseResult::new("not found is not ok", not_found().await),
        CaseResult::new("head only leaves the body unread", head_only().await),
    ];
    finish("Fetch Basics", cases)
}

async fn get_text() -> anyhow::Result<()> {
    let (host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/"))).await?;
    anyhow::ensure!(response.ok(), "expected ok, got {}", response.status());
    anyhow::ensure!(response.status_text() == "OK", "status text {:?}", response.status_text());
    anyhow::ensure!(
        response.content_type().is_some_and(|ct| ct.starts_with("text/plain")),
        "content type {:?}",
        response.content_type()
    );

    let text = response.text().await?;
    anyhow::ensure!(text == "Hello, World!", "unexpected body {text:?}");
    expect_no_leaks(&host).await
}

async fn post_json() -> anyhow::Result<()> {
    let (host, client) = connect();
    let request = FetchRequest::post(url("/post")).body(RequestBody::json(&json!({ "name": "tauri" }))?);
    let value: serde_json::Value = client.fetch(request).await?.json().await?;
    anyhow::ensure!(value["message"] == "axum, tauri!", "unexpected body {value}");
    expect_no_leaks(&host).await
}

async fn headers() -> anyhow::Result<()> {
    let (host, client) = connect();
    let request = FetchRequest::get(url("/headers")).header("x-request", "one");
    let value: serde_json::Value = client.fetch(request).await?.json().await?;
    anyhow::ensure!(value["x-harness"] == "ipc-fetch-test", "missing default header in {value}");
    anyhow::ensure!(value["x-request"] == "one", "missing request header in {value}");
    expect_no_leaks(&host).await
}

async fn no_content() -> anyhow::Result<()> {
    let (host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/no-content"))).await?;
    anyhow::ensure!(response.status() == StatusCode::NO_CONTENT);
    anyhow::ensure!(!response.has_body(), "204 must not expose a body");
    anyhow::ensure!(response.bytes().await?.is_empty());
    expect_no_leaks(&host).await
}

async fn not_found() -> anyhow::Result<()> {
    let (host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/missing"))).await?;
    anyhow::ensure!(response.status() == StatusCode::NOT_FOUND);
    anyhow::ensure!(!response.ok());
    anyhow::ensure!(response.status_text() == "Not Found");
    response.bytes().await?;
    expect_no_leaks(&host).await
}

async fn head_only() -> anyhow::Result<()> {
    let (host, client) = connect();
    let response = client.fetch(FetchRequest::get(url("/stream-body"))).await?;
    let body = response
        .into_body()
        .ok_or_else(|| anyhow::anyhow!("expected a body"))?;
    anyhow::ensure!(!body.is_started(), "body read before it was polled");
    // body, txid and rxid stay registered until the body is read or cancelled
    anyhow::ensure!(host.resource_count() == 3, "resources: {}", host.resource_count());
    Ok(())
}
