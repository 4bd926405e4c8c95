use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::AppResult,
    models::{NormalizedRecord, RawCreditRecord, RawMovieRecord, UNKNOWN_TITLE},
};

/// Reads every row of a CSV file with headers
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded CSV");
    Ok(rows)
}

/// Merges metadata and credit rows into one canonical record per movie.
///
/// Inner join on id: a movie missing from either source is dropped. Output
/// keeps metadata order. When both sources carry a title, the metadata title
/// wins; a missing or blank title becomes [`UNKNOWN_TITLE`].
pub fn normalize(movies: Vec<RawMovieRecord>, credits: Vec<RawCreditRecord>) -> Vec<NormalizedRecord> {
    let mut credit_titles: HashMap<i64, Option<String>> = HashMap::with_capacity(credits.len());
    for credit in credits {
        credit_titles.entry(credit.id).or_insert(credit.title);
    }

    let total = movies.len();
    let records: Vec<NormalizedRecord> = movies
        .into_iter()
        .filter_map(|movie| {
            let credit_title = credit_titles.get(&movie.id)?;
            Some(normalize_one(movie, credit_title.as_deref()))
        })
        .collect();

    tracing::info!(
        movies = total,
        credits = credit_titles.len(),
        merged = records.len(),
        "Normalized corpus"
    );

    records
}

fn normalize_one(movie: RawMovieRecord, credit_title: Option<&str>) -> NormalizedRecord {
    let title = non_blank(movie.title.as_deref())
        .or_else(|| non_blank(credit_title))
        .unwrap_or(UNKNOWN_TITLE)
        .to_string();

    let overview = non_blank(movie.overview.as_deref()).map(str::to_string);
    let keywords = movie
        .keywords
        .as_deref()
        .map(extract_names)
        .filter(|k| !k.is_empty());

    let search_blob = build_search_blob(&title, overview.as_deref(), keywords.as_deref());

    NormalizedRecord {
        id: movie.id,
        title,
        search_blob,
        description: overview,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reduces a serialized list of objects to its comma-joined `name` attributes.
///
/// Text that does not parse as JSON is returned verbatim. A JSON value that
/// is not a list is returned in its JSON form.
pub fn extract_names(field: &str) -> String {
    if field.trim().is_empty() {
        return String::new();
    }

    match serde_json::from_str::<Value>(field) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object())
            .map(|obj| obj.get("name").and_then(Value::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(", "),
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "Keyword field is not JSON, using raw text");
            field.to_string()
        }
    }
}

/// Space-joins title, synopsis and keywords, skipping absent parts
pub fn build_search_blob(title: &str, overview: Option<&str>, keywords: Option<&str>) -> String {
    [Some(title), overview, keywords]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
