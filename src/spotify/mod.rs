//! # Spotify Integration Module
//!
//! Thin client for the two Spotify services the backend talks to:
//!
//! - [`auth`] - Accounts service: authorization URL construction and the
//!   authorization-code (PKCE) token exchange
//! - [`playlists`] - Web API: the current user's playlists and the tracks of
//!   one playlist, normalized into the shapes the frontend consumes
//!
//! All calls take a shared [`reqwest::Client`] and the base URLs from
//! [`crate::config::SpotifyConfig`], so tests can point them at a mock
//! server. Non-2xx upstream answers surface as [`SpotifyError::Upstream`]
//! carrying the original status code and body.

pub mod auth;
pub mod playlists;

use reqwest::{Response, StatusCode};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("request to Spotify failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Spotify answered {status}")]
    Upstream { status: StatusCode, detail: Value },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Turns a non-success response into [`SpotifyError::Upstream`], keeping
/// the JSON body when there is one and the raw text otherwise.
pub(crate) async fn upstream_error(response: Response) -> SpotifyError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str(&text).unwrap_or(Value::String(text));
    SpotifyError::Upstream { status, detail }
}
