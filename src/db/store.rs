//! Vector store abstraction
//!
//! A store holds `(id, search text, embedding, metadata)` rows and answers
//! similarity-ordered lookups. Postgres with pgvector is the production
//! backend; an exact in-memory scan backs tests and local runs.

use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{
        embedding::ensure_dimensions,
        recommendation::{MAX_TOP_K, MIN_TOP_K},
        ContentItem, ContentType,
    },
};

/// Rows per committed insert chunk
pub const INSERT_BATCH_SIZE: usize = 1000;

/// What to do with ids that already exist in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Attempt the insert; conflicts surface in [`PutReport::conflicts`]
    #[default]
    Reject,
    /// Pre-check existing ids and leave them out of the insert
    Skip,
}

impl DuplicatePolicy {
    pub fn from_skip_flag(skip_duplicates: bool) -> Self {
        if skip_duplicates {
            DuplicatePolicy::Skip
        } else {
            DuplicatePolicy::Reject
        }
    }
}

/// Outcome of one `put` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutReport {
    /// Rows committed
    pub inserted: usize,
    /// Ids left out because they already existed (skip mode only)
    pub skipped: Vec<i64>,
    /// Ids that hit a primary-key conflict
    pub conflicts: Vec<i64>,
    /// Ids whose embedding length did not match the store dimensionality
    pub rejected: Vec<i64>,
    /// Ids that failed for any other reason, with the reason
    pub failed: Vec<(i64, String)>,
}

impl PutReport {
    pub fn merge(&mut self, other: PutReport) {
        self.inserted += other.inserted;
        self.skipped.extend(other.skipped);
        self.conflicts.extend(other.conflicts);
        self.rejected.extend(other.rejected);
        self.failed.extend(other.failed);
    }
}

/// Result of `ensure_schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaState {
    /// True if this call created the table
    pub created: bool,
    /// Rows present after the call
    pub existing_rows: i64,
}

/// One row returned by `nearest`, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatch {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub content_type: ContentType,
    /// Cosine distance: 0 identical, 1 orthogonal, 2 opposite
    pub distance: f64,
}

impl StoredMatch {
    /// `1 - distance`; only meaningful for cosine distance
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Corpus-wide embedding dimensionality
    fn dimensions(&self) -> usize;

    /// Creates the content table if it does not exist. Idempotent.
    async fn ensure_schema(&self) -> AppResult<SchemaState>;

    /// Inserts items in chunks of [`INSERT_BATCH_SIZE`], each chunk committed
    /// on its own. A failing chunk is retried row by row so one bad row does
    /// not discard the rest.
    async fn put(&self, items: Vec<ContentItem>, policy: DuplicatePolicy)
        -> AppResult<PutReport>;

    /// Up to `k` rows ordered by ascending cosine distance (ties by id),
    /// optionally restricted to one content type.
    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<ContentType>,
    ) -> AppResult<Vec<StoredMatch>>;

    /// Largest id in the store, if any
    async fn max_id(&self) -> AppResult<Option<i64>>;

    /// Subset of `ids` already present
    async fn existing_ids(&self, ids: &[i64]) -> AppResult<HashSet<i64>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validates `k` against the supported range
pub fn validate_k(k: usize) -> AppResult<()> {
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&k) {
        return Err(AppError::InvalidInput(format!(
            "top_k must be between {} and {}",
            MIN_TOP_K, MAX_TOP_K
        )));
    }
    Ok(())
}

/// Removes items that must never reach the insert statement.
///
/// Drops wrong-length embeddings and, in skip mode, ids that already exist
/// or repeat earlier in the same input.
pub async fn screen_items<S: VectorStore + ?Sized>(
    store: &S,
    items: Vec<ContentItem>,
    policy: DuplicatePolicy,
) -> AppResult<(Vec<ContentItem>, PutReport)> {
    let mut report = PutReport::default();
    let dimensions = store.dimensions();

    let mut valid = Vec::with_capacity(items.len());
    for item in items {
        match ensure_dimensions(&item.embedding, dimensions) {
            Ok(()) => valid.push(item),
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "Rejecting content item");
                report.rejected.push(item.id);
            }
        }
    }

    if policy == DuplicatePolicy::Skip && !valid.is_empty() {
        let ids: Vec<i64> = valid.iter().map(|item| item.id).collect();
        let mut seen = store.existing_ids(&ids).await?;

        tracing::info!(
            existing = seen.len(),
            candidates = ids.len(),
            "Skipping content ids already in store"
        );

        valid.retain(|item| {
            if seen.insert(item.id) {
                true
            } else {
                report.skipped.push(item.id);
                false
            }
        });
    }

    Ok((valid, report))
}
