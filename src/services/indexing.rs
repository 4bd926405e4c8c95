//! One-shot indexing pipeline.
//!
//! `LoadRaw -> Normalize -> LoadCachedEmbeddings | Embed -> EnsureSchema ->
//! Insert -> InsertSupplementary -> Done`. A failure in any stage aborts the
//! run. Chunks committed before the failure stay committed and the embedding
//! artifact stays on disk, so a rerun skips straight past `Embed`.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    config::Config,
    db::{DuplicatePolicy, PutReport, SchemaState, VectorStore},
    error::{AppError, AppResult},
    models::{ContentItem, Embedding, RawCreditRecord, RawMovieRecord},
    services::{
        artifact,
        embedders::Embedder,
        normalizer::{normalize, read_csv},
        supplementary::{assign_ids, SUPPLEMENTARY_ENTRIES},
    },
};

/// Texts per `embed_batch` call
pub const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStage {
    LoadRaw,
    Normalize,
    LoadCachedEmbeddings,
    Embed,
    EnsureSchema,
    Insert,
    InsertSupplementary,
    Done,
}

impl Display for IndexStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndexStage::LoadRaw => "load_raw",
            IndexStage::Normalize => "normalize",
            IndexStage::LoadCachedEmbeddings => "load_cached_embeddings",
            IndexStage::Embed => "embed",
            IndexStage::EnsureSchema => "ensure_schema",
            IndexStage::Insert => "insert",
            IndexStage::InsertSupplementary => "insert_supplementary",
            IndexStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub movies_csv: PathBuf,
    pub credits_csv: PathBuf,
    pub artifact_dir: PathBuf,
    pub policy: DuplicatePolicy,
    pub include_supplementary: bool,
    pub embed_batch_size: usize,
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            movies_csv: config.movies_csv.clone(),
            credits_csv: config.credits_csv.clone(),
            artifact_dir: config.artifact_dir.clone(),
            policy: DuplicatePolicy::from_skip_flag(config.skip_duplicates),
            include_supplementary: config.include_supplementary,
            embed_batch_size: EMBED_BATCH_SIZE,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    /// Records left after normalization
    pub records: usize,
    /// True when embeddings came from an artifact instead of the embedder
    pub reused_artifact: bool,
    pub artifact: PathBuf,
    pub schema: Option<SchemaState>,
    pub corpus: PutReport,
    pub supplementary: PutReport,
}

pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    options: IndexOptions,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        options: IndexOptions,
    ) -> AppResult<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(AppError::DimensionMismatch {
                expected: store.dimensions(),
                actual: embedder.dimensions(),
            });
        }
        Ok(Self {
            embedder,
            store,
            options,
        })
    }

    /// Runs the pipeline against the configured CSV sources
    pub async fn run(&self) -> AppResult<IndexReport> {
        let mut stage = IndexStage::LoadRaw;
        let result = self.load_and_index(&mut stage).await;
        finish(stage, result)
    }

    /// Runs the pipeline over raw rows already in memory
    pub async fn run_with(
        &self,
        movies: Vec<RawMovieRecord>,
        credits: Vec<RawCreditRecord>,
    ) -> AppResult<IndexReport> {
        let mut stage = IndexStage::LoadRaw;
        let result = self.index(movies, credits, &mut stage).await;
        finish(stage, result)
    }

    async fn load_and_index(&self, stage: &mut IndexStage) -> AppResult<IndexReport> {
        enter(stage, IndexStage::LoadRaw);
        let movies: Vec<RawMovieRecord> = read_csv(&self.options.movies_csv)?;
        let credits: Vec<RawCreditRecord> = read_csv(&self.options.credits_csv)?;
        self.index(movies, credits, stage).await
    }

    async fn index(
        &self,
        movies: Vec<RawMovieRecord>,
        credits: Vec<RawCreditRecord>,
        stage: &mut IndexStage,
    ) -> AppResult<IndexReport> {
        let mut report = IndexReport::default();

        enter(stage, IndexStage::Normalize);
        let records = normalize(movies, credits);
        report.records = records.len();

        let dimensions = self.store.dimensions();
        let fingerprint =
            artifact::corpus_fingerprint(&records, &self.embedder.model_id(), dimensions);
        report.artifact = artifact::artifact_path(&self.options.artifact_dir, &fingerprint);

        enter(stage, IndexStage::LoadCachedEmbeddings);
        let embeddings = match artifact::load(&report.artifact, records.len(), dimensions)? {
            Some(embeddings) => {
                tracing::info!(path = %report.artifact.display(), "Reusing embedding artifact");
                report.reused_artifact = true;
                embeddings
            }
            None => {
                enter(stage, IndexStage::Embed);
                let texts: Vec<String> = records.iter().map(|r| r.search_blob.clone()).collect();
                let embeddings = self.embed_all(&texts).await?;
                artifact::save(&report.artifact, &embeddings)?;
                embeddings
            }
        };

        enter(stage, IndexStage::EnsureSchema);
        let schema = self.store.ensure_schema().await?;
        if schema.existing_rows > 0 && self.options.policy == DuplicatePolicy::Reject {
            tracing::warn!(
                existing_rows = schema.existing_rows,
                "Store already has rows and duplicate skipping is off, expect id conflicts"
            );
        }
        report.schema = Some(schema);

        enter(stage, IndexStage::Insert);
        let items: Vec<ContentItem> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| ContentItem::movie(record, embedding))
            .collect();
        report.corpus = self.store.put(items, self.options.policy).await?;
        log_put("corpus", &report.corpus);

        if self.options.include_supplementary {
            enter(stage, IndexStage::InsertSupplementary);
            report.supplementary = self.insert_supplementary().await?;
            log_put("supplementary", &report.supplementary);
        }

        enter(stage, IndexStage::Done);
        Ok(report)
    }

    /// Embeds `texts` in chunks, preserving order
    async fn embed_all(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        let batch_size = self.options.embed_batch_size.max(1);
        let batches = texts.len().div_ceil(batch_size);
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, chunk) in texts.chunks(batch_size).enumerate() {
            let batch = self.embedder.embed_batch(chunk).await?;
            if batch.len() != chunk.len() {
                return Err(AppError::EmbeddingProvider(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    batch.len()
                )));
            }
            embeddings.extend(batch);
            tracing::debug!(batch = i + 1, batches, "Embedded batch");
        }

        tracing::info!(
            texts = texts.len(),
            strategy = self.embedder.name(),
            "Embedded corpus"
        );
        Ok(embeddings)
    }

    async fn insert_supplementary(&self) -> AppResult<PutReport> {
        let max_id = self.store.max_id().await?;
        let ids = assign_ids(max_id, SUPPLEMENTARY_ENTRIES.len());
        let texts: Vec<String> = SUPPLEMENTARY_ENTRIES
            .iter()
            .map(|entry| entry.search_blob())
            .collect();
        let embeddings = self.embed_all(&texts).await?;

        let items: Vec<ContentItem> = SUPPLEMENTARY_ENTRIES
            .iter()
            .zip(ids)
            .zip(embeddings)
            .map(|((entry, id), embedding)| entry.into_item(id, embedding))
            .collect();

        self.store.put(items, self.options.policy).await
    }
}

fn enter(stage: &mut IndexStage, next: IndexStage) {
    *stage = next;
    tracing::info!(stage = %next, "Indexing stage");
}

fn log_put(what: &str, report: &PutReport) {
    tracing::info!(
        what = what,
        inserted = report.inserted,
        skipped = report.skipped.len(),
        conflicts = report.conflicts.len(),
        rejected = report.rejected.len(),
        failed = report.failed.len(),
        "Insert finished"
    );
}

fn finish(stage: IndexStage, result: AppResult<IndexReport>) -> AppResult<IndexReport> {
    if let Err(e) = &result {
        tracing::error!(stage = %stage, error = %e, "Indexing aborted");
    }
    result
}
