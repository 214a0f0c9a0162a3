use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod connection;
mod mcp_handler;
mod use_cases;

use connection::blob_store;
use lotto_lib::{DrawArchiveStore, HttpDrawSource, RecommendationSampler, SNAPSHOT_URL, SyncEngine, build_client};
use mcp_handler::{MCPHandler, stdio};
use use_cases::{ArchiveUseCase, RecommendationUseCase, SyncUseCase};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's roll your lotto numbers.");

    let store = DrawArchiveStore::new(blob_store(&config.database_path)?);
    let source = HttpDrawSource::new(config.request_timeout)?;
    let engine = Arc::new(SyncEngine::new(source, store, config.sync_config()));

    let sync_use_case = SyncUseCase::new(
        Arc::clone(&engine),
        build_client(config.request_timeout)?,
        SNAPSHOT_URL.to_string(),
    );
    let archive_use_case = ArchiveUseCase::new(Arc::clone(&engine));
    let recommendation_use_case =
        RecommendationUseCase::new(Arc::clone(&engine), RecommendationSampler::from_entropy());

    let handler = MCPHandler::new(
        Arc::new(sync_use_case),
        Arc::new(archive_use_case),
        Arc::new(recommendation_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
