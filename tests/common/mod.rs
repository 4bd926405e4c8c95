#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use reelsearch::{
    db::{DuplicatePolicy, MemoryVectorStore, VectorStore},
    error::{AppError, AppResult},
    models::{ContentItem, ContentType, Embedding},
    services::Embedder,
};

/// Words the keyword embedder counts, one dimension each
pub const VOCABULARY: [&str; 12] = [
    "space", "alien", "pirate", "ship", "heist", "bank", "love", "paris", "comedy", "trailer",
    "spy", "ocean",
];

pub const DIMENSIONS: usize = VOCABULARY.len();

/// Deterministic bag-of-words embedder over [`VOCABULARY`]
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of texts embedded so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Embedding {
    let mut vector = vec![0.0; DIMENSIONS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if let Some(i) = VOCABULARY.iter().position(|v| word.starts_with(v)) {
            vector[i] += 1.0;
        }
    }
    vector
}

#[async_trait::async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_id(&self) -> String {
        "keyword-test".to_string()
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Claims `dimensions` but always answers with `actual` values
pub struct ShortEmbedder {
    pub dimensions: usize,
    pub actual: usize,
}

#[async_trait::async_trait]
impl Embedder for ShortEmbedder {
    async fn embed(&self, _text: &str) -> AppResult<Embedding> {
        Ok(vec![0.5; self.actual])
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        Ok(texts.iter().map(|_| vec![0.5; self.actual]).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        "short-test".to_string()
    }

    fn name(&self) -> &'static str {
        "short"
    }
}

/// Always fails like an unreachable provider
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> AppResult<Embedding> {
        Err(AppError::EmbeddingProvider(
            "Embedding API returned status 500".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Embedding>> {
        Err(AppError::EmbeddingProvider(
            "Embedding API returned status 500".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_id(&self) -> String {
        "failing-test".to_string()
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub fn item(id: i64, title: &str, blob: &str, content_type: ContentType) -> ContentItem {
    ContentItem {
        id,
        title: title.to_string(),
        search_blob: blob.to_string(),
        embedding: keyword_vector(blob),
        description: Some(format!("About {}", title)),
        url: match content_type {
            ContentType::Movie => None,
            ContentType::OtherMedia => Some(format!("https://www.youtube.com/watch?v=clip{}", id)),
        },
        content_type,
        created_at: Utc::now(),
    }
}

/// Three movies and one clip
pub fn sample_items() -> Vec<ContentItem> {
    vec![
        item(1, "Star Voyage", "space alien ship", ContentType::Movie),
        item(2, "Sea Raiders", "pirate ship ocean", ContentType::Movie),
        item(3, "The Vault", "heist bank spy", ContentType::Movie),
        item(4, "Space Trailer Reel", "space trailer alien", ContentType::OtherMedia),
    ]
}

pub async fn seeded_store() -> Arc<MemoryVectorStore> {
    let store = Arc::new(MemoryVectorStore::new(DIMENSIONS));
    let report = store
        .put(sample_items(), DuplicatePolicy::Reject)
        .await
        .unwrap();
    assert_eq!(report.inserted, 4);
    store
}
