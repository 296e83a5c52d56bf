//! Configuration management for the download backend.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. Resolution order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the working directory
//! 3. `.env` in the local data directory (`<data_local_dir>/sporldl/.env`)
//! 4. Built-in defaults
//!
//! Command line flags may override a few values after loading (see
//! `main.rs`).

use std::{env, ops::RangeInclusive, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Upper bound for durations given in seconds (ten years).
const MAX_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Loads environment variables from `.env` files.
///
/// Creates the local data directory if needed. A missing `.env` file is
/// not an error: every setting has a default or is optional.
///
/// # Directory Structure
///
/// The data directory `.env` lives in:
/// - Linux: `~/.local/share/sporldl/.env`
/// - macOS: `~/Library/Application Support/sporldl/.env`
/// - Windows: `%LOCALAPPDATA%/sporldl/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    // dotenv never overrides variables that are already set, so the working
    // directory file wins over the data directory one
    dotenv::dotenv().ok();
    dotenv::from_path(path).ok();
    Ok(())
}

/// Root of the application's local data (`<data_local_dir>/sporldl`).
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporldl");
    path
}

/// Spotify OAuth and Web API settings.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    /// `SPOTIFY_API_AUTH_CLIENT_ID`. Login is unavailable without it.
    pub client_id: Option<String>,
    /// `SPOTIFY_API_AUTH_CLIENT_SECRET`. Optional with PKCE.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Where the browser lands after a successful login.
    pub frontend_redirect: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8000/api/auth/spotify/callback".to_string(),
            scope: "playlist-read-private user-read-email".to_string(),
            auth_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
            frontend_redirect: "http://localhost:5173/auth/callback".to_string(),
        }
    }
}

/// Runtime configuration of the server and the CLI commands.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub downloads_dir: PathBuf,
    pub ytdlp_bin: String,
    pub audio_format: String,
    pub audio_quality: String,
    pub search_limit: usize,
    /// How long finished jobs stay pollable.
    pub job_ttl: Duration,
    pub sweep_interval: Duration,
    pub cors_origins: Vec<String>,
    pub spotify: SpotifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8000".to_string(),
            downloads_dir: data_dir().join("downloads"),
            ytdlp_bin: "yt-dlp".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
            search_limit: 5,
            job_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            cors_origins: vec![
                "http://localhost:8081".to_string(),
                "http://localhost:5173".to_string(),
            ],
            spotify: SpotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from environment variables, falling back to
    /// [`AppConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let spotify = SpotifyConfig {
            client_id: var("SPOTIFY_API_AUTH_CLIENT_ID"),
            client_secret: var("SPOTIFY_API_AUTH_CLIENT_SECRET"),
            redirect_uri: var("SPOTIFY_API_REDIRECT_URI").unwrap_or(defaults.spotify.redirect_uri),
            scope: var("SPOTIFY_API_AUTH_SCOPE").unwrap_or(defaults.spotify.scope),
            auth_url: var("SPOTIFY_API_AUTH_URL").unwrap_or(defaults.spotify.auth_url),
            token_url: var("SPOTIFY_API_TOKEN_URL").unwrap_or(defaults.spotify.token_url),
            api_url: var("SPOTIFY_API_URL").unwrap_or(defaults.spotify.api_url),
            frontend_redirect: var("FRONTEND_REDIRECT")
                .unwrap_or(defaults.spotify.frontend_redirect),
        };

        Ok(Self {
            server_addr: var("SERVER_ADDRESS").unwrap_or(defaults.server_addr),
            downloads_dir: var("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            ytdlp_bin: var("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            audio_format: var("AUDIO_FORMAT").unwrap_or(defaults.audio_format),
            audio_quality: var("AUDIO_QUALITY").unwrap_or(defaults.audio_quality),
            search_limit: parse_var("SEARCH_LIMIT")?.unwrap_or(defaults.search_limit),
            job_ttl: secs_in_range("JOB_TTL_SECS", parse_var("JOB_TTL_SECS")?, 0..=MAX_SECS)?
                .unwrap_or(defaults.job_ttl),
            sweep_interval: secs_in_range(
                "JOB_SWEEP_INTERVAL_SECS",
                parse_var("JOB_SWEEP_INTERVAL_SECS")?,
                1..=MAX_SECS,
            )?
            .unwrap_or(defaults.sweep_interval),
            cors_origins: var("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.cors_origins),
            spotify,
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key).map(|value| parse_value(key, value)).transpose()
}

fn parse_value<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

fn secs_in_range(
    key: &'static str,
    secs: Option<u64>,
    range: RangeInclusive<u64>,
) -> Result<Option<Duration>, ConfigError> {
    match secs {
        Some(secs) if !range.contains(&secs) => Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
            reason: format!(
                "must be between {} and {} seconds",
                range.start(),
                range.end()
            ),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
