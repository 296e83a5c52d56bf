//! Download submission and progress polling.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use crate::{
    fetcher::WorkSpec,
    types::{DownloadRequest, DownloadStarted, ProgressResponse},
    utils,
};

use super::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// POST /api/download
/// Queue a download and return the job id to poll.
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<DownloadStarted>> {
    let Json(req) = body?;
    validate_video_id(&req.video_id)?;

    let spec = WorkSpec::for_video(&state.config.downloads_dir, &req.video_id, &req.title);
    let job_id = state.runner.submit(spec)?;
    tracing::info!(job_id = %job_id, video_id = %req.video_id, "download submitted");

    Ok(Json(DownloadStarted {
        status: "started".to_string(),
        track_id: job_id.clone(),
        job_id,
        video_id: req.video_id,
    }))
}

/// GET /api/progress/{job_id}
pub async fn progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let job = state.registry.get(&job_id)?;
    Ok(Json(ProgressResponse::from(&job)))
}

fn validate_video_id(video_id: &str) -> Result<(), ApiError> {
    if utils::is_valid_video_id(video_id) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("invalid video_id {:?}", video_id)))
    }
}
