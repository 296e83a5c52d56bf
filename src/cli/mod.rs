//! # CLI Module
//!
//! Command implementations behind the `sporldl` binary.
//!
//! - [`serve`] - Runs the HTTP backend
//! - [`search`] - Searches for a track and prints candidates as a table
//! - [`download`] - Downloads one video locally through the same job runner
//!   the server uses, rendering progress by polling the job registry
//!
//! Console output goes through the crate's `info!`, `success!`, `warning!`
//! and `error!` macros. Fatal errors terminate the process with exit code 1.
//!
//! ## Usage Patterns
//!
//! ```bash
//! sporldl serve --addr 0.0.0.0:8000
//! sporldl search "Stayin' Alive" "Bee Gees"
//! sporldl download dQw4w9WgXcQ "Never Gonna Give You Up"
//! ```

mod download;
mod search;
mod serve;

pub use download::download;
pub use search::search;
pub use serve::serve;
