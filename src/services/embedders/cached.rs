use std::sync::Arc;
use std::time::Duration;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::Embedding,
    services::embedders::Embedder,
};

/// Embedder decorator that caches single-prompt embeddings in Redis.
///
/// Batch calls (indexing) bypass the cache. A cached vector of the wrong
/// length counts as a miss.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache,
    ttl_secs: u64,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: Cache, ttl: Duration) -> Self {
        Self {
            inner,
            cache,
            ttl_secs: ttl.as_secs().max(1),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        let key = CacheKey::PromptEmbedding {
            model: self.inner.model_id(),
            prompt: text.to_string(),
        };
        let dimensions = self.inner.dimensions();

        cached!(
            self.cache,
            key,
            self.ttl_secs,
            self.inner.embed(text),
            |v: &Embedding| v.len() == dimensions
        )
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }

    fn name(&self) -> &'static str {
        "cached"
    }
}
