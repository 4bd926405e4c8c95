//! Fixed-length embedding vectors and their store-native text form.
//!
//! The store speaks pgvector's text literal (`[v1,v2,...]`). Values are
//! written with Rust's shortest round-trip `f32` formatting, so every finite
//! vector reads back unchanged.

use crate::error::{AppError, AppResult};
use serde_json::Value;

/// A single embedding produced by one model version
pub type Embedding = Vec<f32>;

/// Fails with `DimensionMismatch` unless `vector` has exactly `expected` entries
pub fn ensure_dimensions(vector: &[f32], expected: usize) -> AppResult<()> {
    if vector.len() != expected {
        return Err(AppError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Flattens an arbitrarily nested JSON number array into one vector.
///
/// Providers sometimes answer a single input with a batch-of-one (`[[...]]`).
pub fn flatten_json(value: &Value) -> AppResult<Embedding> {
    let mut out = Vec::new();
    flatten_into(value, &mut out)?;
    Ok(out)
}

fn flatten_into(value: &Value, out: &mut Embedding) -> AppResult<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
            Ok(())
        }
        Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| {
                AppError::EmbeddingProvider(format!("Non-finite embedding value: {}", n))
            })?;
            out.push(v as f32);
            Ok(())
        }
        other => Err(AppError::EmbeddingProvider(format!(
            "Unexpected value in embedding payload: {}",
            other
        ))),
    }
}

/// Renders a vector as a pgvector text literal
pub fn to_literal(vector: &[f32]) -> String {
    let mut literal = String::with_capacity(vector.len() * 12 + 2);
    literal.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        literal.push_str(&v.to_string());
    }
    literal.push(']');
    literal
}

/// Parses a pgvector text literal, the inverse of [`to_literal`].
///
/// Rows are only ever read back as distances, so this is only needed to
/// check round-trips.
#[cfg(test)]
pub(crate) fn parse_literal(literal: &str) -> AppResult<Embedding> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| AppError::Internal(format!("Malformed vector literal: {}", literal)))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| AppError::Internal(format!("Malformed vector component: {}", e)))
        })
        .collect()
}

/// Cosine distance in `[0, 2]`. Zero vectors are treated as orthogonal to everything,
/// matching [`normalize_distance`] on the pgvector side.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    1.0 - similarity
}

/// Maps pgvector's NaN distance (a zero-norm operand) to orthogonal
pub fn normalize_distance(distance: f64) -> f64 {
    if distance.is_finite() {
        distance
    } else {
        1.0
    }
}
