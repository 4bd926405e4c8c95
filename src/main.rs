use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelsearch::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, PgVectorStore},
    services::{embedders, Recommender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let embedder = embedders::from_config(&config).await?;
    let (embedder, cache_writer) = embedders::with_prompt_cache(embedder, &config)?;

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

    let state = Arc::new(AppState::new(Recommender::new(embedder, store)));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
