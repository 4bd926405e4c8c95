use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        recommendation::DEFAULT_TOP_K, ContentType, RecommendationRequest, RecommendationResponse,
    },
};

use super::AppState;

/// Query string of `GET /api/v1/recommendations`
///
/// `content_type` defaults to `Movie`; `all` disables the filter.
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub prompt: String,
    pub top_k: Option<usize>,
    pub content_type: Option<String>,
}

impl RecommendationQuery {
    fn content_filter(&self) -> AppResult<Option<ContentType>> {
        match self.content_type.as_deref().map(str::trim) {
            None | Some("") => Ok(Some(ContentType::Movie)),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
            Some(value) => value
                .parse::<ContentType>()
                .map(Some)
                .map_err(AppError::InvalidInput),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `POST /api/v1/recommendations`
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    respond(
        &state,
        &request_id,
        request.prompt,
        request.top_k,
        request.content_type,
    )
    .await
}

/// `GET /api/v1/recommendations`
pub async fn recommend_query(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let filter = params.content_filter()?;
    let top_k = params.top_k.unwrap_or(DEFAULT_TOP_K);
    respond(&state, &request_id, params.prompt, top_k, filter).await
}

async fn respond(
    state: &AppState,
    request_id: &RequestId,
    prompt: String,
    top_k: usize,
    filter: Option<ContentType>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        top_k,
        content_type = ?filter,
        "Processing recommendation request"
    );

    let recommendations = state.recommender.recommend(&prompt, top_k, filter).await?;

    if recommendations.is_empty() {
        tracing::info!(request_id = %request_id, "No recommendations found");
        return Err(AppError::NotFound(
            "No recommendations found for this prompt".to_string(),
        ));
    }

    tracing::info!(
        request_id = %request_id,
        count = recommendations.len(),
        "Recommendations completed"
    );

    Ok(Json(RecommendationResponse {
        count: recommendations.len(),
        recommendations,
        prompt,
    }))
}
