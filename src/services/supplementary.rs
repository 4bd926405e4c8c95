use chrono::Utc;

use crate::models::{
    content::{bounded_title, truncate_chars, MAX_DESCRIPTION_CHARS, MAX_URL_CHARS},
    ContentItem, ContentType, Embedding,
};

/// A curated non-catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplementaryEntry {
    pub title: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

impl SupplementaryEntry {
    /// Text fed to the embedder
    pub fn search_blob(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    pub fn into_item(self, id: i64, embedding: Embedding) -> ContentItem {
        ContentItem {
            id,
            title: bounded_title(self.title),
            search_blob: self.search_blob(),
            embedding,
            description: Some(truncate_chars(self.description, MAX_DESCRIPTION_CHARS)),
            url: Some(truncate_chars(self.url, MAX_URL_CHARS)),
            content_type: ContentType::OtherMedia,
            created_at: Utc::now(),
        }
    }
}

pub const SUPPLEMENTARY_ENTRIES: [SupplementaryEntry; 5] = [
    SupplementaryEntry {
        title: "Best Movie Trailers 2024",
        description: "A compilation of the most exciting movie trailers from 2024, featuring action, drama, and comedy films.",
        url: "https://www.youtube.com/watch?v=example1",
    },
    SupplementaryEntry {
        title: "Classic Movie Moments",
        description: "Iconic scenes from classic cinema that have stood the test of time, including dramatic monologues and unforgettable action sequences.",
        url: "https://www.youtube.com/watch?v=example2",
    },
    SupplementaryEntry {
        title: "Sci-Fi Movie Compilation",
        description: "The best science fiction movie clips featuring space exploration, futuristic technology, and alien encounters.",
        url: "https://www.youtube.com/watch?v=example3",
    },
    SupplementaryEntry {
        title: "Comedy Movie Highlights",
        description: "Funniest moments from popular comedy movies that will make you laugh out loud.",
        url: "https://www.youtube.com/watch?v=example4",
    },
    SupplementaryEntry {
        title: "Thriller Movie Scenes",
        description: "Heart-pounding scenes from the best thriller movies, featuring suspense, mystery, and intense action.",
        url: "https://www.youtube.com/watch?v=example5",
    },
];

/// Sequential ids starting just above the store's current maximum
pub fn assign_ids(max_id: Option<i64>, count: usize) -> Vec<i64> {
    let start = max_id.unwrap_or(0) + 1;
    (0..count as i64).map(|offset| start + offset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_ids_above_max() {
        assert_eq!(assign_ids(Some(459488), 3), vec![459489, 459490, 459491]);
        assert_eq!(assign_ids(None, 2), vec![1, 2]);
    }

    #[test]
    fn test_into_item_is_other_media_with_url() {
        let entry = SUPPLEMENTARY_ENTRIES[2];
        let item = entry.into_item(10, vec![0.0; 4]);

        assert_eq!(item.content_type, ContentType::OtherMedia);
        assert_eq!(item.url.as_deref(), Some("https://www.youtube.com/watch?v=example3"));
        assert_eq!(
            item.search_blob,
            "Sci-Fi Movie Compilation The best science fiction movie clips featuring space exploration, futuristic technology, and alien encounters."
        );
        assert_eq!(item.description.as_deref(), Some(entry.description));
    }
}
