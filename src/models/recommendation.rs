use serde::{Deserialize, Serialize};

use super::content::ContentType;

/// Default number of recommendations
pub const DEFAULT_TOP_K: usize = 10;
/// Inclusive bounds on `top_k`
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 50;
/// Display length of a recommendation description
pub const DESCRIPTION_DISPLAY_CHARS: usize = 500;

/// A ranked match for one query.
///
/// `similarity_score` is `1 - cosine distance`: 1.0 means identical direction,
/// 0.0 orthogonal. Results are ordered by non-increasing score. The convention
/// only holds while the store ranks by cosine distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub similarity_score: f64,
    pub url: Option<String>,
    pub content_type: ContentType,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_content_type() -> Option<ContentType> {
    Some(ContentType::Movie)
}

/// Request body for recommendations
///
/// `content_type` defaults to `Movie`; an explicit `null` searches every type.
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub prompt: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_content_type")]
    pub content_type: Option<ContentType>,
}

/// Response envelope for recommendations
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub prompt: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"prompt": "space opera"}"#).unwrap();
        assert_eq!(request.top_k, 10);
        assert_eq!(request.content_type, Some(ContentType::Movie));
    }

    #[test]
    fn test_request_null_content_type_means_all() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"prompt": "space opera", "content_type": null}"#).unwrap();
        assert_eq!(request.content_type, None);
    }

    #[test]
    fn test_recommendation_serialization() {
        let rec = Recommendation {
            id: 5,
            title: "Alien".to_string(),
            description: "In space no one can hear you scream.".to_string(),
            similarity_score: 0.75,
            url: None,
            content_type: ContentType::Movie,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["similarity_score"], 0.75);
        assert_eq!(json["content_type"], "Movie");
        assert!(json["url"].is_null());
    }
}
