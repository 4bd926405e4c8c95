//! Embedding strategies
//!
//! Every strategy produces vectors of one fixed dimensionality. A provider
//! answer of any other length fails the call with `DimensionMismatch`;
//! vectors are never padded or truncated.
use std::sync::Arc;

use crate::{
    config::{Config, EmbeddingProviderKind},
    db::{create_redis_client, Cache, CacheWriterHandle},
    error::{AppError, AppResult},
    models::Embedding,
};

pub mod cached;
pub mod local;
pub mod remote;

pub use cached::CachedEmbedder;
pub use local::LocalEmbedder;
pub use remote::{RemoteEmbedder, RemoteEmbedderOptions};

/// Trait for text embedding strategies
///
/// Implementations are constructed once and shared read-only across
/// concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single text
    async fn embed(&self, text: &str) -> AppResult<Embedding>;

    /// Embeds many texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>>;

    /// Output dimensionality every vector must match
    fn dimensions(&self) -> usize;

    /// Model identifier, used in cache keys and artifact fingerprints
    fn model_id(&self) -> String;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Builds the configured embedding strategy
pub async fn from_config(config: &Config) -> AppResult<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding_provider {
        EmbeddingProviderKind::Local => Arc::new(
            LocalEmbedder::load(
                config.embedding_model.clone(),
                config.model_cache_dir.clone(),
                config.embedding_dimensions,
            )
            .await?,
        ),
        EmbeddingProviderKind::Remote => Arc::new(RemoteEmbedder::new(
            RemoteEmbedderOptions::from_config(config),
        )?),
    };

    tracing::info!(
        strategy = embedder.name(),
        model = %embedder.model_id(),
        dimensions = embedder.dimensions(),
        "Embedder ready"
    );

    Ok(embedder)
}

/// Wraps `embedder` with the Redis prompt cache when `REDIS_URL` is set
pub fn with_prompt_cache(
    embedder: Arc<dyn Embedder>,
    config: &Config,
) -> AppResult<(Arc<dyn Embedder>, Option<CacheWriterHandle>)> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        return Ok((embedder, None));
    };

    let client = create_redis_client(redis_url)
        .map_err(|e| AppError::Internal(format!("Invalid REDIS_URL: {}", e)))?;
    let (cache, handle) = Cache::new(client, config.cache_timeout());

    tracing::info!(
        ttl_secs = config.prompt_cache_ttl_secs,
        timeout_ms = config.cache_timeout_ms,
        "Prompt embedding cache enabled"
    );

    let cached = CachedEmbedder::new(embedder, cache, config.prompt_cache_ttl());
    Ok((Arc::new(cached), Some(handle)))
}
