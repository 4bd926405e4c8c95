pub mod content;
pub mod embedding;
pub mod raw;
pub mod recommendation;

pub use content::{ContentItem, ContentType, NormalizedRecord, UNKNOWN_TITLE};
pub use embedding::Embedding;
pub use raw::{RawCreditRecord, RawMovieRecord};
pub use recommendation::{Recommendation, RecommendationRequest, RecommendationResponse};
