//! Local sentence-embedding model via fastembed.
//!
//! The model is loaded once (downloading weights into the cache directory on
//! first use) and stays resident. Inference runs on the blocking pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{InitOptions, TextEmbedding};

use crate::{
    error::{AppError, AppResult},
    models::{embedding::ensure_dimensions, Embedding},
    services::embedders::Embedder,
};

/// Resident fastembed model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbedder {
    /// Loads the model on the blocking pool
    pub async fn load(
        model_name: String,
        cache_dir: PathBuf,
        dimensions: usize,
    ) -> AppResult<Self> {
        tokio::task::spawn_blocking(move || Self::new(&model_name, cache_dir, dimensions))
            .await
            .map_err(|e| AppError::Internal(format!("Model load task failed: {}", e)))?
    }

    /// Loads the model and checks it produces `dimensions`-length vectors.
    ///
    /// Blocks; may download model weights into `cache_dir` the first time.
    pub fn new(model_name: &str, cache_dir: PathBuf, dimensions: usize) -> AppResult<Self> {
        let model_enum = parse_model_name(model_name)?;

        std::fs::create_dir_all(&cache_dir)?;

        tracing::info!(model = model_name, cache_dir = %cache_dir.display(), "Loading embedding model");

        let options = InitOptions::new(model_enum)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| AppError::EmbeddingProvider(format!("Model initialization failed: {}", e)))?;

        let sample = model
            .embed(vec!["dimension check"], None)
            .map_err(|e| AppError::EmbeddingProvider(e.to_string()))?;
        let actual = sample.first().map(Vec::len).unwrap_or(0);
        if actual != dimensions {
            return Err(AppError::DimensionMismatch {
                expected: dimensions,
                actual,
            });
        }

        tracing::info!(model = model_name, dimensions, "Embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    async fn run(&self, texts: Vec<String>) -> AppResult<Vec<Embedding>> {
        let model = Arc::clone(&self.model);

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|e| {
                AppError::Internal(format!("Failed to acquire model lock: {}", e))
            })?;
            model
                .embed(texts, None)
                .map_err(|e| AppError::EmbeddingProvider(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))??;

        for embedding in &embeddings {
            ensure_dimensions(embedding, self.dimensions)?;
        }

        Ok(embeddings)
    }
}

#[async_trait::async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingProvider("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.run(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        self.model_name.clone()
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Maps a model name to fastembed's enum
fn parse_model_name(name: &str) -> AppResult<fastembed::EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        }
        "all-minilm-l6-v2-q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        _ => Err(AppError::InvalidInput(format!(
            "Unsupported local embedding model: {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_name() {
        assert!(matches!(
            parse_model_name("all-MiniLM-L6-v2"),
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name("BGE-small-en-v1.5"),
            Ok(fastembed::EmbeddingModel::BGESmallENV15)
        ));
    }

    #[test]
    fn test_parse_unknown_model() {
        assert!(matches!(
            parse_model_name("word2vec"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn test_local_model_produces_384_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = LocalEmbedder::load(
            "all-MiniLM-L6-v2".to_string(),
            dir.path().to_path_buf(),
            384,
        )
        .await
        .unwrap();

        let vector = embedder.embed("a heist in space").await.unwrap();
        assert_eq!(vector.len(), 384);
    }
}
