//! Media fetcher capability.
//!
//! The job tracker only knows the [`MediaFetcher`] trait: search for
//! candidate videos and download one of them while emitting progress
//! events. [`YtDlpFetcher`] implements it on top of the `yt-dlp` binary.

mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{jobs::ProgressSink, types::SearchResult, utils};

pub use ytdlp::YtDlpFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch fetcher: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("fetcher i/o failed: {0}")]
    Io(std::io::Error),
    #[error("{0}")]
    Failed(String),
    #[error("unexpected fetcher output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cancelled")]
    Cancelled,
    #[error("download task aborted: {0}")]
    Aborted(String),
}

/// What to download and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSpec {
    pub url: String,
    /// Output template; the fetcher substitutes the final extension for
    /// `%(ext)s`.
    pub output: PathBuf,
}

impl WorkSpec {
    /// Download of a YouTube video into `downloads_dir`, named after the
    /// sanitized title (or the video id if nothing is left of the title).
    pub fn for_video(downloads_dir: &Path, video_id: &str, title: &str) -> Self {
        let mut base = utils::sanitize_filename(title);
        if base.is_empty() {
            base = utils::sanitize_filename(video_id);
        }
        Self {
            url: utils::youtube_watch_url(video_id),
            output: downloads_dir.join(format!("{}.%(ext)s", base)),
        }
    }
}

/// One raw search hit. Any field may be missing; callers skip entries
/// without an id or a title.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns up to `limit` candidates for `query`. An empty list is not
    /// an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>, FetchError>;

    /// Downloads `spec.url`, emitting progress through `progress`. Returns
    /// only after post-processing has produced the final file.
    async fn download(&self, spec: &WorkSpec, progress: &ProgressSink) -> Result<(), FetchError>;
}

/// Turns raw search hits into results, skipping entries without an id or a
/// title.
pub fn normalize_entries(entries: Vec<SearchEntry>) -> Vec<SearchResult> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let video_id = entry.id.filter(|id| !id.is_empty())?;
            let title = entry.title.filter(|t| !t.is_empty())?;
            let thumbnail = entry
                .thumbnail
                .or_else(|| entry.thumbnails.into_iter().last().map(|t| t.url))
                .unwrap_or_else(|| utils::youtube_thumbnail_url(&video_id));
            Some(SearchResult {
                title,
                duration: entry
                    .duration
                    .filter(|d| d.is_finite() && *d >= 0.0)
                    .map(|d| d.round() as u64),
                url: utils::youtube_watch_url(&video_id),
                video_id,
                thumbnail,
            })
        })
        .collect()
}

/// Searches for `"<title> <artist>"` and normalizes the hits.
pub async fn search_tracks(
    fetcher: &dyn MediaFetcher,
    title: &str,
    artist: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, FetchError> {
    let query = format!("{} {}", title.trim(), artist.trim());
    let entries = fetcher.search(query.trim(), limit).await?;
    Ok(normalize_entries(entries))
}
