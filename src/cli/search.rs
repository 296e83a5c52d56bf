use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    config::AppConfig,
    error,
    fetcher::{self, YtDlpFetcher},
    types::SearchTableRow,
    utils, warning,
};

pub async fn search(config: &AppConfig, title: &str, artist: &str) {
    let ytdlp = YtDlpFetcher::from_config(config);

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Searching for {} {}...", title, artist));
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }

    let results = fetcher::search_tracks(&ytdlp, title, artist, config.search_limit).await;
    pb.finish_and_clear();

    let results = match results {
        Ok(results) => results,
        Err(e) => error!("Search failed. Err: {}", e),
    };

    if results.is_empty() {
        warning!("No tracks found.");
        return;
    }

    let rows: Vec<SearchTableRow> = results
        .into_iter()
        .map(|r| SearchTableRow {
            video_id: r.video_id,
            title: r.title,
            duration: r
                .duration
                .map(|secs| utils::format_duration(secs * 1000))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
}
