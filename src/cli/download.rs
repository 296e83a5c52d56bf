use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;

use crate::{
    config::AppConfig,
    error,
    fetcher::{WorkSpec, YtDlpFetcher},
    jobs::{JobRegistry, JobRunner, JobState},
    success, utils,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Downloads one video in the foreground.
///
/// The download runs through a [`JobRunner`] exactly as it would on the
/// server; this command is just another client polling the registry.
pub async fn download(config: &AppConfig, video_id: &str, title: &str) {
    if !utils::is_valid_video_id(video_id) {
        error!("Invalid video id {:?}", video_id);
    }

    if let Err(e) = async_fs::create_dir_all(&config.downloads_dir).await {
        error!(
            "Cannot create downloads directory {}. Err: {}",
            config.downloads_dir.display(),
            e
        );
    }

    let registry = Arc::new(JobRegistry::new());
    let runner = JobRunner::new(
        Arc::clone(&registry),
        Arc::new(YtDlpFetcher::from_config(config)),
    );

    let spec = WorkSpec::for_video(&config.downloads_dir, video_id, title);
    let target = spec.output.clone();
    let job_id = match runner.submit(spec) {
        Ok(id) => id,
        Err(e) => error!("Cannot start download. Err: {}", e),
    };

    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.blue/white} {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    loop {
        let job = match registry.get(&job_id) {
            Ok(job) => job,
            Err(e) => {
                pb.abandon();
                error!("Lost track of download. Err: {}", e);
            }
        };

        pb.set_position(job.percent.round() as u64);
        pb.set_message(match (job.transferred, job.eta_seconds) {
            (true, _) => "converting...".to_string(),
            (false, Some(eta)) => format!("eta {}s", eta),
            (false, None) => String::new(),
        });

        match job.state {
            JobState::Done => {
                pb.finish_and_clear();
                success!("Downloaded {}", target.display());
                return;
            }
            JobState::Failed => {
                pb.abandon();
                error!(
                    "Download failed. Err: {}",
                    job.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            JobState::Queued | JobState::Running => sleep(POLL_INTERVAL).await,
        }
    }
}
