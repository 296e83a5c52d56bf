//! Spotify Web API proxy endpoints.

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query, State, rejection::QueryRejection},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;

use crate::{
    spotify::playlists::{self, SortOrder, TrackSort},
    types::{PlaylistsResponse, TracksResponse},
};

use super::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Spotify access token taken from an `Authorization: Bearer` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let missing = || ApiError::Unauthorized("Missing or invalid Authorization header".to_string());
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(missing)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(missing)?;
        Ok(BearerToken(token.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// GET /api/spotify/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<PlaylistsResponse>> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let limit = bounded_limit(params.limit, 50)?;

    let playlists = playlists::get_playlists(
        &state.http,
        &state.config.spotify.api_url,
        &token,
        limit,
        params.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(PlaylistsResponse { playlists }))
}

/// GET /api/spotify/playlists/{playlist_id}/tracks
pub async fn list_playlist_tracks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(playlist_id): Path<String>,
    params: Result<Query<TrackParams>, QueryRejection>,
) -> ApiResult<Json<TracksResponse>> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let limit = bounded_limit(params.limit, 100)?;
    let order = match params.sort_order.as_deref() {
        None => SortOrder::default(),
        Some(raw) => parse_keyword::<SortOrder>("sort_order", raw)?,
    };
    let sort = params
        .sort_by
        .as_deref()
        .map(|raw| parse_keyword::<TrackSort>("sort_by", raw))
        .transpose()?
        .map(|by| (by, order));

    let tracks = playlists::get_playlist_tracks(
        &state.http,
        &state.config.spotify.api_url,
        &token,
        &playlist_id,
        limit,
        params.offset.unwrap_or(0),
        sort,
    )
    .await?;

    Ok(Json(TracksResponse { tracks }))
}

fn bounded_limit(limit: Option<u32>, max: u32) -> Result<u32, ApiError> {
    match limit.unwrap_or(20) {
        l if (1..=max).contains(&l) => Ok(l),
        l => Err(ApiError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            max, l
        ))),
    }
}

fn parse_keyword<T: serde::de::DeserializeOwned>(name: &str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ApiError::Validation(format!("invalid {} {:?}", name, raw)))
}
