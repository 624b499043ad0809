use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::RawQuery;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use ipc_fetch::IpcFetch;
use ipc_fetch_host::RouterHost;
use serde::Deserialize;

pub const BASE_URL: &str = "http://localhost";

/// Lines produced by `/stream-body`.
pub const STREAM_LINES: [&str; 5] = ["count 0\n", "count 1\n", "count 2\n", "count 3\n", "count 4\n"];

const BOUNDARY: &str = "ipc-fetch-boundary";

#[derive(Deserialize)]
struct Greet {
    name: String,
}

async fn greet(Json(greet): Json<Greet>) -> impl IntoResponse {
    Json(serde_json::json!({ "message": format!("axum, {}!", greet.name) }))
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let object: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                value.to_str().unwrap_or_default().into(),
            )
        })
        .collect();
    Json(object)
}

async fn echo_query(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn stream_body() -> Body {
    let stream = async_stream::stream! {
        for line in STREAM_LINES {
            yield Ok::<_, std::io::Error>(Bytes::from_static(line.as_bytes()));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    Body::from_stream(stream)
}

async fn endless() -> Body {
    let stream = async_stream::stream! {
        let mut i = 0u64;
        loop {
            yield Ok::<_, std::io::Error>(Bytes::from(format!("tick {i}\n")));
            i += 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    Body::from_stream(stream)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "too late"
}

async fn form() -> impl IntoResponse {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"field\"\r\n\r\n\
         value\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         file contents\r\n\
         --{BOUNDARY}--\r\n"
    );
    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )],
        body,
    )
}

async fn binary() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0u8, 1, 2, 255],
    )
}

async fn not_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{not json")
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/post", post(greet))
        .route("/headers", get(echo_headers))
        .route("/query", get(echo_query))
        .route("/stream-body", get(stream_body))
        .route("/endless", get(endless))
        .route("/slow", get(slow))
        .route("/no-content", get(|| async { StatusCode::NO_CONTENT }))
        .route("/form", get(form))
        .route("/binary", get(binary))
        .route("/not-json", get(not_json))
}

/// A fresh host and a client bound to it.
pub fn connect() -> (Arc<RouterHost>, IpcFetch) {
    let host = Arc::new(RouterHost::new(router()));
    let client = IpcFetch::builder(host.clone())
        .default_header("x-harness", "ipc-fetch-test")
        .build();
    (host, client)
}

pub fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

/// Wait for spawned cancel notifications to land, then check the host is empty.
pub async fn expect_no_leaks(host: &RouterHost) -> anyhow::Result<()> {
    for _ in 0..50 {
        if host.resource_count() == 0 {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("host still holds {} resource(s)", host.resource_count())
}
