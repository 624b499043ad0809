use std::time::Duration;

use futures::StreamExt;
use ipc_fetch::adapter::{
    AdapterConfig, AdapterDefaults, AdapterErrorCode, CancelToken, FormValue, HttpAdapter,
    ResponseData, ResponseType,
};
use serde_json::json;

use crate::report::{CaseResult, finish};
use crate::server::{BASE_URL, STREAM_LINES, connect, expect_no_leaks};

pub async fn run() -> anyhow::Result<()> {
    let cases = vec![
        CaseResult::new("json inferred from content type", json_inferred().await),
        CaseResult::new("text inferred from content type", text_inferred().await),
        CaseResult::new("arraybuffer inferred from content type", arraybuffer().await),
        CaseResult::new("params appended to url", params().await),
        CaseResult::new("multipart form data", form_data().await),
        CaseResult::new("stream response type", stream().await),
        CaseResult::new("timeout cancels the transfer", timeout().await),
        CaseResult::new("cancel token cancels the transfer", cancel_token().await),
        CaseResult::new("invalid json is a bad response", bad_response().await),
    ];
    finish("HTTP Adapter", cases)
}

fn adapter() -> (std::sync::Arc<ipc_fetch_host::RouterHost>, HttpAdapter) {
    let (host, client) = connect();
    let defaults = AdapterDefaults::new()
        .base_url(BASE_URL)
        .timeout(Duration::from_secs(10))
        .header("x-adapter", "axios");
    (host, HttpAdapter::with_defaults(client, defaults))
}

async fn json_inferred() -> anyhow::Result<()> {
    let (host, adapter) = adapter();
    let response = adapter.post("/post", json!({ "name": "adapter" })).await?;
    let ResponseData::Json(value) = &response.data else {
        anyhow::bail!("expected json, got {:?}", response.data);
    };
    anyhow::ensure!(value["message"] == "axum, adapter!", "unexpected body {value}");
    anyhow::ensure!(
        response
            .headers
            .get("content-type")
            .is_some_and(|ct| ct == "application/json"),
        "headers {:?}",
        response.headers
    );
    expect_no_leaks(&host).await
}

async fn text_inferred() -> anyhow::Result<()> {
    let (_host, adapter) = adapter();
    let response = adapter.get("/").await?;
    anyhow::ensure!(
        response.data.as_text() == Some("Hello, World!"),
        "unexpected body {:?}",
        response.data
    );
    anyhow::ensure!(response.status_text == "OK");
    Ok(())
}

async fn arraybuffer() -> anyhow::Result<()> {
    let (_host, adapter) = adapter();
    let response = adapter.get("/binary").await?;
    let ResponseData::ArrayBuffer(bytes) = &response.data else {
        anyhow::bail!("expected arraybuffer, got {:?}", response.data);
    };
    anyhow::ensure!(bytes.as_ref() == [0u8, 1, 2, 255]);
    Ok(())
}

async fn params() -> anyhow::Result<()> {
    let (_host, adapter) = adapter();
    let config = AdapterConfig::new("/query")
        .param("q", "a b")
        .param("list", "1,2");
    let response = adapter.request(config).await?;
    let query = response.data.as_text().unwrap_or_default();
    anyhow::ensure!(query == "q=a+b&list=1,2", "unexpected query {query:?}");
    Ok(())
}

async fn form_data() -> anyhow::Result<()> {
    let (_host, adapter) = adapter();
    let response = adapter.get("/form").await?;
    let ResponseData::FormData(form) = &response.data else {
        anyhow::bail!("expected form data, got {:?}", response.data);
    };
    anyhow::ensure!(
        form.get("field").and_then(FormValue::as_text) == Some("value"),
        "field: {:?}",
        form.get("field")
    );
    match form.get("upload") {
        Some(FormValue::File { file_name, bytes, .. }) => {
            anyhow::ensure!(file_name == "a.txt", "file name {file_name:?}");
            anyhow::ensure!(bytes.as_ref() == b"file contents");
        }
        other => anyhow::bail!("expected a file, got {other:?}"),
    }
    Ok(())
}

async fn stream() -> anyhow::Result<()> {
    let (host, adapter) = adapter();
    let config = AdapterConfig::new("/stream-body").response_type(ResponseType::Stream);
    let response = adapter.request(config).await?;
    let mut body = response
        .data
        .into_stream()
        .ok_or_else(|| anyhow::anyhow!("expected a stream"))?;

    let mut text = String::new();
    while let Some(chunk) = body.next().await {
        text.push_str(std::str::from_utf8(&chunk?)?);
    }
    anyhow::ensure!(text == STREAM_LINES.concat(), "unexpected body {text:?}");
    expect_no_leaks(&host).await
}

async fn timeout() -> anyhow::Result<()> {
    let (host, adapter) = adapter();
    let config = AdapterConfig::new("/slow").timeout(Duration::from_millis(50));

    let started = tokio::time::Instant::now();
    let err = match adapter.request(config).await {
        Ok(response) => anyhow::bail!("expected a timeout, got {}", response.status),
        Err(err) => err,
    };
    anyhow::ensure!(err.code() == AdapterErrorCode::Canceled, "code {:?}", err.code());
    anyhow::ensure!(err.code().as_str() == "ERR_CANCELED");
    anyhow::ensure!(
        started.elapsed() < Duration::from_secs(5),
        "timeout took {:?}",
        started.elapsed()
    );
    expect_no_leaks(&host).await
}

async fn cancel_token() -> anyhow::Result<()> {
    let (host, adapter) = adapter();
    let (token, cancel) = CancelToken::source();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel("navigated away");
    });

    let err = match adapter.request(AdapterConfig::new("/slow").cancel_token(token.clone())).await {
        Ok(response) => anyhow::bail!("expected cancellation, got {}", response.status),
        Err(err) => err,
    };
    anyhow::ensure!(err.is_canceled(), "expected cancellation, got {err}");
    anyhow::ensure!(token.reason() == Some("navigated away"));
    expect_no_leaks(&host).await
}

async fn bad_response() -> anyhow::Result<()> {
    let (_host, adapter) = adapter();
    let err = match adapter.get("/not-json").await {
        Ok(response) => anyhow::bail!("expected a decode failure, got {:?}", response.data),
        Err(err) => err,
    };
    anyhow::ensure!(err.code() == AdapterErrorCode::BadResponse, "code {:?}", err.code());
    let request = err
        .request()
        .ok_or_else(|| anyhow::anyhow!("missing request snapshot"))?;
    anyhow::ensure!(request.url == format!("{BASE_URL}/not-json"), "url {}", request.url);
    anyhow::ensure!(
        request.headers.get("x-adapter").is_some_and(|v| v == "axios"),
        "snapshot headers {:?}",
        request.headers
    );
    Ok(())
}
