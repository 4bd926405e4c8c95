use std::sync::Arc;

use crate::{
    db::{store::validate_k, StoredMatch, VectorStore},
    error::{AppError, AppResult},
    models::{
        content::truncate_chars, recommendation::DESCRIPTION_DISPLAY_CHARS, ContentType,
        Recommendation,
    },
    services::embedders::Embedder,
};

/// Answers natural-language recommendation queries
///
/// Each call validates, embeds the prompt, then asks the store for the
/// nearest rows. Steps run strictly in sequence. An empty result is `Ok`;
/// whether that is user-visible as "not found" is the caller's choice.
pub struct Recommender {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Recommender {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn recommend(
        &self,
        prompt: &str,
        k: usize,
        filter: Option<ContentType>,
    ) -> AppResult<Vec<Recommendation>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidInput("Prompt cannot be empty".to_string()));
        }
        validate_k(k)?;

        let query = self.embedder.embed(prompt).await?;
        let matches = self.store.nearest(&query, k, filter).await?;

        tracing::debug!(
            k,
            filter = ?filter,
            results = matches.len(),
            store = self.store.name(),
            "Nearest neighbours retrieved"
        );

        Ok(matches.into_iter().map(to_recommendation).collect())
    }
}

fn to_recommendation(row: StoredMatch) -> Recommendation {
    let similarity_score = row.similarity();
    Recommendation {
        id: row.id,
        title: row.title,
        description: row
            .description
            .map(|d| truncate_chars(&d, DESCRIPTION_DISPLAY_CHARS))
            .unwrap_or_default(),
        similarity_score,
        url: row.url,
        content_type: row.content_type,
    }
}
