use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::embedding::Embedding;

/// Placeholder substituted for missing or blank titles
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Store column bounds
pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_SEARCH_BLOB_CHARS: usize = 4000;
pub const MAX_DESCRIPTION_CHARS: usize = 4000;
pub const MAX_URL_CHARS: usize = 1000;

/// Kind of content, used as a retrieval filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Primary catalog movie
    Movie,
    /// Non-catalog media such as curated clips
    #[serde(alias = "YouTube Clips")]
    OtherMedia,
}

impl ContentType {
    /// Text stored in the `content_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "Movie",
            ContentType::OtherMedia => "OtherMedia",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Movie" | "movie" => Ok(ContentType::Movie),
            "OtherMedia" | "other_media" | "YouTube Clips" => Ok(ContentType::OtherMedia),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

/// Canonical corpus record before embedding
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub id: i64,
    /// Never empty; see [`UNKNOWN_TITLE`]
    pub title: String,
    /// The exact text fed to the embedder
    pub search_blob: String,
    /// Display text (the synopsis), never embedded on its own
    pub description: Option<String>,
}

/// One retrievable unit of content as persisted in the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    pub search_blob: String,
    pub embedding: Embedding,
    pub description: Option<String>,
    pub url: Option<String>,
    pub content_type: ContentType,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Builds a catalog movie from a normalized record and its embedding,
    /// applying the store's column bounds.
    pub fn movie(record: NormalizedRecord, embedding: Embedding) -> Self {
        Self {
            id: record.id,
            title: bounded_title(&record.title),
            search_blob: truncate_chars(&record.search_blob, MAX_SEARCH_BLOB_CHARS),
            embedding,
            description: record
                .description
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
            url: None,
            content_type: ContentType::Movie,
            created_at: Utc::now(),
        }
    }
}

/// Truncates to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Applies the title fallback and the title column bound
pub fn bounded_title(title: &str) -> String {
    if title.trim().is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        truncate_chars(title, MAX_TITLE_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_serde() {
        assert_eq!(
            serde_json::to_string(&ContentType::Movie).unwrap(),
            r#""Movie""#
        );
        let legacy: ContentType = serde_json::from_str(r#""YouTube Clips""#).unwrap();
        assert_eq!(legacy, ContentType::OtherMedia);
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("Movie".parse::<ContentType>(), Ok(ContentType::Movie));
        assert_eq!(
            "OtherMedia".parse::<ContentType>(),
            Ok(ContentType::OtherMedia)
        );
        assert!("Podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_bounded_title() {
        assert_eq!(bounded_title("   "), UNKNOWN_TITLE);
        assert_eq!(bounded_title(&"x".repeat(600)).chars().count(), 500);
    }

    #[test]
    fn test_movie_applies_bounds() {
        let record = NormalizedRecord {
            id: 19995,
            title: "Avatar".to_string(),
            search_blob: "b".repeat(5000),
            description: Some("d".repeat(4500)),
        };
        let item = ContentItem::movie(record, vec![0.0; 3]);
        assert_eq!(item.search_blob.len(), MAX_SEARCH_BLOB_CHARS);
        assert_eq!(item.description.unwrap().len(), MAX_DESCRIPTION_CHARS);
        assert_eq!(item.content_type, ContentType::Movie);
        assert!(item.url.is_none());
    }
}
