use story_ingest::config::{init_logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::load()?;
    tracing::info!("Starting story ingestion service on {}", config.bind_addr);

    story_ingest::server::run(config).await
}
