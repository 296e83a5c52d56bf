use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    fetcher,
    types::{SearchRequest, SearchResult},
};

use super::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// POST /api/search
/// Look up candidate videos for a track title and artist.
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let Json(req) = body?;
    if req.title.trim().is_empty() && req.artist.trim().is_empty() {
        return Err(ApiError::Validation("title or artist is required".to_string()));
    }

    let results = fetcher::search_tracks(
        state.fetcher.as_ref(),
        &req.title,
        &req.artist,
        state.config.search_limit,
    )
    .await
    .map_err(|e| ApiError::Internal(format!("Search failed: {}", e)))?;

    if results.is_empty() {
        return Err(ApiError::NotFound("No tracks found".to_string()));
    }

    tracing::debug!(count = results.len(), "search results");
    Ok(Json(results))
}
