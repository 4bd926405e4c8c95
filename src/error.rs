use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Store connection error: {0}")]
    StoreConnection(String),

    #[error("Duplicate content id: {0}")]
    DuplicateKey(i64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Maps a sqlx error, classifying unique violations as `DuplicateKey` and
    /// session acquisition failures as `StoreConnection`.
    pub fn from_insert(id: i64, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateKey(id)
            }
            _ => AppError::from_store(err),
        }
    }

    /// Maps a sqlx error raised while talking to the store.
    pub fn from_store(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::StoreConnection(err.to_string()),
            other => AppError::Database(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateKey(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::EmbeddingProvider(_) | AppError::DimensionMismatch { .. } => (
                StatusCode::BAD_GATEWAY,
                "Embedding provider unavailable, please retry".to_string(),
            ),
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream request failed".to_string(),
            ),
            AppError::StoreConnection(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Recommendation store unavailable".to_string(),
            ),
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Io(_)
            | AppError::Csv(_)
            | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
