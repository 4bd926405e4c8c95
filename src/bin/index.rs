use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelsearch::{
    config::Config,
    db::{create_pool, PgVectorStore},
    services::{embedders, IndexOptions, Indexer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let embedder = embedders::from_config(&config).await?;
    let pool = create_pool(
        &config.database_url,
        config.max_connections,
        config.store_timeout(),
    )?;
    let store = Arc::new(PgVectorStore::new(
        pool,
        config.embedding_dimensions,
        config.store_timeout(),
    ));

    let indexer = Indexer::new(embedder, store, IndexOptions::from_config(&config))?;
    let report = indexer.run().await?;

    tracing::info!(
        records = report.records,
        reused_artifact = report.reused_artifact,
        artifact = %report.artifact.display(),
        inserted = report.corpus.inserted,
        skipped = report.corpus.skipped.len(),
        conflicts = report.corpus.conflicts.len(),
        failed = report.corpus.failed.len(),
        supplementary = report.supplementary.inserted,
        "Indexing complete"
    );

    Ok(())
}
