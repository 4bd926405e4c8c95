//! On-disk embedding artifact.
//!
//! A header-less, row-major file of little-endian `f32` values, `N x D`, in
//! normalized corpus order. The file name carries a fingerprint of the model,
//! the dimensionality and every `(id, search_blob)` pair, so an artifact is
//! only ever reused for the exact corpus snapshot that produced it.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{
    error::AppResult,
    models::{Embedding, NormalizedRecord},
};

const FINGERPRINT_HEX_CHARS: usize = 16;

/// Content hash of a normalized corpus under one model
pub fn corpus_fingerprint(records: &[NormalizedRecord], model: &str, dimensions: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update((dimensions as u64).to_le_bytes());
    for record in records {
        hasher.update(record.id.to_le_bytes());
        hasher.update((record.search_blob.len() as u64).to_le_bytes());
        hasher.update(record.search_blob.as_bytes());
    }

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
        .chars()
        .take(FINGERPRINT_HEX_CHARS)
        .collect()
}

/// Artifact file for a fingerprint inside `dir`
pub fn artifact_path(dir: &Path, fingerprint: &str) -> PathBuf {
    dir.join(format!("embeddings-{}.f32", fingerprint))
}

/// Writes embeddings row by row; the parent directory is created if needed
pub fn save(path: &Path, embeddings: &[Embedding]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let total: usize = embeddings.iter().map(Vec::len).sum();
    let mut bytes = Vec::with_capacity(total * 4);
    for value in embeddings.iter().flatten() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    // Write then rename so an interrupted run never leaves a truncated artifact
    let tmp = path.with_extension("f32.partial");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;

    tracing::info!(path = %path.display(), rows = embeddings.len(), "Saved embedding artifact");
    Ok(())
}

/// Loads `rows x dimensions` embeddings.
///
/// Returns `None` when the file is absent or its size does not match.
pub fn load(path: &Path, rows: usize, dimensions: usize) -> AppResult<Option<Vec<Embedding>>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let expected = rows * dimensions * 4;
    if bytes.len() != expected || dimensions == 0 {
        tracing::warn!(
            path = %path.display(),
            expected_bytes = expected,
            actual_bytes = bytes.len(),
            "Ignoring embedding artifact with unexpected size"
        );
        return Ok(None);
    }

    let embeddings = bytes
        .chunks_exact(dimensions * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();

    Ok(Some(embeddings))
}
