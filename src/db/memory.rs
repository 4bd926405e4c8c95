//! In-process vector store.
//!
//! Scans every row and ranks by exact cosine distance. Commit semantics mirror
//! the Postgres store: a chunk either lands whole or is retried row by row.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::{
    db::store::{
        screen_items, validate_k, DuplicatePolicy, PutReport, SchemaState, StoredMatch,
        VectorStore, INSERT_BATCH_SIZE,
    },
    error::AppResult,
    models::{
        embedding::{cosine_distance, ensure_dimensions},
        ContentItem, ContentType,
    },
};

pub struct MemoryVectorStore {
    dimensions: usize,
    rows: RwLock<Vec<ContentItem>>,
}

impl MemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Snapshot of a stored row
    pub async fn get(&self, id: i64) -> Option<ContentItem> {
        self.rows
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn ensure_schema(&self) -> AppResult<SchemaState> {
        Ok(SchemaState {
            created: false,
            existing_rows: self.rows.read().await.len() as i64,
        })
    }

    async fn put(
        &self,
        items: Vec<ContentItem>,
        policy: DuplicatePolicy,
    ) -> AppResult<PutReport> {
        let (items, mut report) = screen_items(self, items, policy).await?;

        for (batch_num, chunk) in items.chunks(INSERT_BATCH_SIZE).enumerate() {
            let mut rows = self.rows.write().await;
            let mut present: HashSet<i64> = rows.iter().map(|item| item.id).collect();

            let chunk_conflicts = chunk.iter().any(|item| !present.insert(item.id));
            if !chunk_conflicts {
                rows.extend(chunk.iter().cloned());
                report.inserted += chunk.len();
                tracing::debug!(batch = batch_num + 1, rows = chunk.len(), "Batch committed");
                continue;
            }

            tracing::warn!(
                batch = batch_num + 1,
                "Batch insert failed, falling back to individual inserts"
            );

            let mut committed: HashSet<i64> = rows.iter().map(|item| item.id).collect();
            for item in chunk {
                if committed.insert(item.id) {
                    rows.push(item.clone());
                    report.inserted += 1;
                } else {
                    tracing::warn!(id = item.id, "Duplicate content id");
                    report.conflicts.push(item.id);
                }
            }
        }

        Ok(report)
    }

    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<ContentType>,
    ) -> AppResult<Vec<StoredMatch>> {
        validate_k(k)?;
        ensure_dimensions(query, self.dimensions)?;

        let rows = self.rows.read().await;
        let mut matches: Vec<StoredMatch> = rows
            .iter()
            .filter(|item| filter.map_or(true, |ct| item.content_type == ct))
            .map(|item| StoredMatch {
                id: item.id,
                title: item.title.clone(),
                description: item.description.clone(),
                url: item.url.clone(),
                content_type: item.content_type,
                distance: cosine_distance(&item.embedding, query),
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(k);

        Ok(matches)
    }

    async fn max_id(&self) -> AppResult<Option<i64>> {
        Ok(self.rows.read().await.iter().map(|item| item.id).max())
    }

    async fn existing_ids(&self, ids: &[i64]) -> AppResult<HashSet<i64>> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .map(|item| item.id)
            .filter(|id| wanted.contains(id))
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
