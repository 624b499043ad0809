pub mod server;
mod report;
mod fetch_basics;
mod body_streaming;
mod cancellation;
mod http_adapter;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    fetch_basics::run().await?;
    body_streaming::run().await?;
    cancellation::run().await?;
    http_adapter::run().await
}
