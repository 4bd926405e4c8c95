use serde::Deserialize;

/// Row of the metadata source (`tmdb_5000_movies.csv`).
///
/// Only the columns the corpus needs are declared; the rest are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawMovieRecord {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text synopsis
    #[serde(default)]
    pub overview: Option<String>,
    /// Serialized list of `{"id": .., "name": ..}` objects
    #[serde(default)]
    pub keywords: Option<String>,
}

/// Row of the credits source (`tmdb_5000_credits.csv`), keyed by `movie_id`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawCreditRecord {
    #[serde(rename = "movie_id", alias = "id")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}
