//! Audio download backend library
//!
//! Searches YouTube for tracks, downloads their audio in the background and
//! tracks every download as a pollable job. Next to that it proxies a few
//! Spotify Web API calls and runs the Spotify login flow for the frontend.
//!
//! # Modules
//!
//! - `api` - HTTP handlers, shared state and error mapping
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `fetcher` - Media search and download capability (`yt-dlp`)
//! - `jobs` - Background job registry, runner and progress reporting
//! - `management` - In-flight OAuth login bookkeeping
//! - `server` - Router construction and the HTTP server loop
//! - `spotify` - Spotify accounts and Web API client
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers

pub mod api;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod jobs;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for top-level operations that may fail.
///
/// Uses a boxed dynamic error trait object with Send + Sync bounds so it can
/// cross await points. Library modules use their own error enums.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Searching for {}", query);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Saved {}", path.display());
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal errors of CLI commands. Never use it inside request
/// handlers or background jobs.
///
/// # Example
///
/// ```
/// error!("Cannot load configuration: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("No results for {}", query);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
