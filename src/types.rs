use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::jobs::{Job, JobState};

/// Access token handed to the frontend after a login. It is not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Seconds until Spotify rejects the token.
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// Seconds.
    pub duration: Option<u64>,
    pub url: String,
    pub video_id: String,
    pub thumbnail: String,
}

#[derive(Tabled)]
pub struct SearchTableRow {
    pub video_id: String,
    pub title: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub video_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStarted {
    pub status: String,
    /// Polling key for `GET /api/progress/{job_id}`.
    pub job_id: String,
    /// Same value as `job_id`, kept for older clients.
    pub track_id: String,
    pub video_id: String,
}

/// Snapshot of a job as returned by the progress endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub job_id: String,
    pub state: String,
    /// Rendered percentage, e.g. `"45.2%"`.
    pub progress: String,
    pub percent: f64,
    pub eta: Option<u64>,
    /// True once the output file is final.
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for ProgressResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            state: job.state.as_str().to_string(),
            progress: format!("{:.1}%", job.percent),
            percent: job.percent,
            eta: job.eta_seconds,
            done: job.state == JobState::Done,
            error: job.error.clone(),
        }
    }
}

// Spotify Web API payloads. Only the fields the proxy reads are modelled.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<Playlist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub tracks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistsResponse {
    pub playlists: Vec<PlaylistSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub album: Option<TrackAlbum>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackArtist {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackAlbum {
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub duration_formatted: String,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub album: TrackAlbum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<TrackSummary>,
}
