//! # API Module
//!
//! HTTP endpoints of the sporldl backend, built on [Axum](https://docs.rs/axum).
//!
//! ## Endpoints
//!
//! ### Downloads
//!
//! - `POST /api/download` - [`download`] queues a background download and
//!   returns its job id immediately
//! - `GET /api/progress/{job_id}` - [`progress`] returns the job's current
//!   snapshot, or 404 for unknown ids
//! - `POST /api/search` - [`search`] finds candidate videos for a track
//!
//! ### Spotify
//!
//! - `GET /api/auth/spotify/login` - [`login`] redirects to Spotify's consent
//!   page (authorization code with PKCE)
//! - `GET /api/auth/spotify/callback` - [`callback`] exchanges the code and
//!   redirects to the frontend with the access token
//! - `GET /api/spotify/playlists` - [`list_playlists`]
//! - `GET /api/spotify/playlists/{playlist_id}/tracks` - [`list_playlist_tracks`]
//!
//! ### Monitoring
//!
//! - `GET /health` - [`health`] reports version and tracked job count
//!
//! Errors are rendered by [`ApiError`] as `{"detail": ...}` with a matching
//! status code.

mod callback;
mod download;
mod error;
mod health;
mod search;
mod spotify;
mod state;

pub use callback::{callback, login};
pub use download::{download, progress};
pub use error::{ApiError, ApiResult};
pub use health::health;
pub use search::search;
pub use spotify::{BearerToken, list_playlist_tracks, list_playlists};
pub use state::AppState;
