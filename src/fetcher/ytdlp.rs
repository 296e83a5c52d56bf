use std::{
    collections::VecDeque,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    jobs::{ProgressEvent, ProgressSink},
};

use super::{FetchError, MediaFetcher, SearchEntry, WorkSpec};

const PROGRESS_PREFIX: &str = "[sporldl] ";
const PROGRESS_TEMPLATE: &str =
    "download:[sporldl] %(progress.status)s|%(progress._percent_str)s|%(progress.eta)s";
const STDERR_TAIL: usize = 20;
/// How often a silent child is checked for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Fetcher backed by the `yt-dlp` command line tool.
///
/// Search runs `yt-dlp --dump-single-json --flat-playlist ytsearchN:<query>`.
/// Downloads extract the best audio stream and transcode it, reading
/// progress from a custom `--progress-template` on stdout.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    audio_format: String,
    audio_quality: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    entries: Vec<Option<SearchEntry>>,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
        }
    }

    pub fn with_audio(mut self, format: impl Into<String>, quality: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self.audio_quality = quality.into();
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.ytdlp_bin).with_audio(&config.audio_format, &config.audio_quality)
    }

    fn search_args(query: &str, limit: usize) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            format!("ytsearch{}:{}", limit.max(1), query),
        ]
    }

    fn download_args(&self, spec: &WorkSpec) -> Vec<String> {
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "--output".to_string(),
            spec.output.to_string_lossy().into_owned(),
            spec.url.clone(),
        ]
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>, FetchError> {
        let output = Command::new(&self.binary)
            .args(Self::search_args(query, limit))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Failed(failure_message(&stderr, output.status)));
        }

        let payload: SearchPayload = serde_json::from_slice(&output.stdout)?;
        Ok(payload.entries.into_iter().flatten().collect())
    }

    async fn download(&self, spec: &WorkSpec, progress: &ProgressSink) -> Result<(), FetchError> {
        let mut child = Command::new(&self.binary)
            .args(self.download_args(spec))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Failed("failed to capture yt-dlp stdout".to_string()))?;
        let stderr = child.stderr.take();

        // drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            Vec::from(tail).join("\n")
        });

        let mut cancel_poll = tokio::time::interval(CANCEL_POLL);
        let mut stdout = BufReader::new(stdout);
        let mut line = Vec::new();
        loop {
            tokio::select! {
                read = stdout.read_until(b'\n', &mut line) => {
                    if read.map_err(FetchError::Io)? == 0 {
                        break;
                    }
                    // progress lines are cosmetic, undecodable bytes never fail a job
                    if let Some(event) = parse_progress_line(&String::from_utf8_lossy(&line)) {
                        progress.emit(event);
                    }
                    line.clear();
                }
                _ = cancel_poll.tick() => {}
            }
            if progress.is_cancelled() {
                return Err(abort(&mut child, stderr_task, progress).await);
            }
        }

        // post-processing runs silently after the last progress line
        let status = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(FetchError::Io)?,
                _ = cancel_poll.tick() => {
                    if progress.is_cancelled() {
                        return Err(abort(&mut child, stderr_task, progress).await);
                    }
                }
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if status.success() {
            return Ok(());
        }

        let message = failure_message(&stderr, status);
        progress.emit(ProgressEvent::Error {
            message: Some(message.clone()),
        });
        Err(FetchError::Failed(message))
    }
}

async fn abort(
    child: &mut Child,
    stderr_task: JoinHandle<String>,
    progress: &ProgressSink,
) -> FetchError {
    tracing::info!(job_id = progress.job_id(), "cancelling yt-dlp");
    stderr_task.abort();
    match child.kill().await {
        Ok(()) => FetchError::Cancelled,
        Err(e) => FetchError::Io(e),
    }
}

/// Parses one line printed through [`PROGRESS_TEMPLATE`].
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let body = line.trim().strip_prefix(PROGRESS_PREFIX.trim_end())?;
    let mut parts = body.trim_start().splitn(3, '|');
    let status = parts.next()?;
    let percent = parts.next();
    let eta = parts.next();
    ProgressEvent::from_status(status, percent, eta)
}

/// Picks the most useful line of yt-dlp's stderr for a failure report.
fn failure_message(stderr: &str, status: ExitStatus) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_downloading_line() {
        let event = parse_progress_line("[sporldl] downloading|  45.2%|17").unwrap();
        assert_eq!(
            event,
            ProgressEvent::Downloading {
                percent: "  45.2%".to_string(),
                eta: Some(17),
            }
        );
    }

    #[test]
    fn test_parse_unknown_eta() {
        let event = parse_progress_line("[sporldl] downloading| 3.0%|NA").unwrap();
        assert_eq!(
            event,
            ProgressEvent::Downloading {
                percent: " 3.0%".to_string(),
                eta: None,
            }
        );
    }

    #[test]
    fn test_parse_finished_line() {
        assert_eq!(
            parse_progress_line("[sporldl] finished|100.0%|NA"),
            Some(ProgressEvent::Finished)
        );
    }

    #[test]
    fn test_ignores_foreign_lines() {
        assert_eq!(parse_progress_line("[ExtractAudio] Destination: a.mp3"), None);
        assert_eq!(parse_progress_line(""), None);
        assert_eq!(parse_progress_line("[sporldl] postprocessing|x|y"), None);
    }

    #[test]
    fn test_download_args_carry_template_and_output() {
        let fetcher = YtDlpFetcher::new("yt-dlp").with_audio("opus", "128K");
        let args = fetcher.download_args(&WorkSpec {
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            output: PathBuf::from("downloads/Song Title.%(ext)s"),
        });
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc123");
        assert!(args.contains(&"downloads/Song Title.%(ext)s".to_string()));
        assert!(args.contains(&"opus".to_string()));
        assert!(args.contains(&PROGRESS_TEMPLATE.to_string()));
    }

    #[test]
    fn test_search_args() {
        let args = YtDlpFetcher::search_args("Song Artist", 3);
        assert_eq!(args.last().unwrap(), "ytsearch3:Song Artist");
        let args = YtDlpFetcher::search_args("x", 0);
        assert_eq!(args.last().unwrap(), "ytsearch1:x");
    }

    #[test]
    fn test_search_payload_skips_null_entries() {
        let json = r#"{"entries": [null, {"id": "abc123", "title": "Song", "duration": 212.0,
            "thumbnails": [{"url": "https://i.ytimg.com/vi/abc123/hq720.jpg"}]}]}"#;
        let payload: SearchPayload = serde_json::from_str(json).unwrap();
        let entries: Vec<SearchEntry> = payload.entries.into_iter().flatten().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("abc123"));
        assert_eq!(entries[0].thumbnails.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_message_prefers_error_line() {
        use std::os::unix::process::ExitStatusExt;

        let status = ExitStatus::from_raw(1 << 8);
        let stderr = "WARNING: slow\nERROR: unable to download: timeout\nsomething after\n";
        assert_eq!(
            failure_message(stderr, status),
            "ERROR: unable to download: timeout"
        );
        assert_eq!(failure_message("  \n", status), format!("yt-dlp exited with {}", status));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::jobs::{Job, JobRegistry, JobRunner, JobState};
        use std::{fs, os::unix::fs::PermissionsExt, sync::Arc, time::Instant};
        use tempfile::TempDir;

        /// Writes a shell script standing in for the yt-dlp binary.
        fn fake_ytdlp(dir: &TempDir, body: &str) -> YtDlpFetcher {
            let path = dir.path().join("yt-dlp");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            YtDlpFetcher::new(path.to_string_lossy())
        }

        fn submit(dir: &TempDir, body: &str) -> (JobRunner, String) {
            let runner = JobRunner::new(
                Arc::new(JobRegistry::new()),
                Arc::new(fake_ytdlp(dir, body)),
            );
            let id = runner
                .submit(WorkSpec::for_video(dir.path(), "abc123", "Song"))
                .unwrap();
            (runner, id)
        }

        async fn wait_until(runner: &JobRunner, id: &str, done: impl Fn(&Job) -> bool) -> Job {
            for _ in 0..500 {
                let job = runner.registry().get(id).unwrap();
                if done(&job) {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("job {id} did not reach the expected state");
        }

        async fn wait_terminal(runner: &JobRunner, id: &str) -> Job {
            wait_until(runner, id, |job| job.state.is_terminal()).await
        }

        #[tokio::test]
        async fn test_download_success() {
            let dir = TempDir::new().unwrap();
            let (runner, id) = submit(
                &dir,
                "echo '[sporldl] downloading|  45.2%|3'\n\
                 echo '[sporldl] finished|100.0%|NA'\n\
                 exit 0",
            );

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Done);
            assert_eq!(job.percent, 100.0);
            assert!(job.transferred);
            assert!(job.error.is_none());
        }

        #[tokio::test]
        async fn test_undecodable_output_does_not_fail_download() {
            let dir = TempDir::new().unwrap();
            let (runner, id) = submit(
                &dir,
                "printf 'caf\\351\\n'\n\
                 echo '[sporldl] downloading| 50.0%|1'\n\
                 exit 0",
            );

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Done);
            assert!(job.error.is_none());
        }

        #[tokio::test]
        async fn test_download_failure_reports_error_line() {
            let dir = TempDir::new().unwrap();
            let (runner, id) = submit(
                &dir,
                "echo '[sporldl] downloading| 10.0%|9'\n\
                 echo 'WARNING: slow' >&2\n\
                 echo 'ERROR: unable to download video data: timeout' >&2\n\
                 exit 1",
            );

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Failed);
            assert_eq!(
                job.error.as_deref(),
                Some("ERROR: unable to download video data: timeout")
            );
            assert_eq!(job.percent, 10.0);
        }

        #[tokio::test]
        async fn test_missing_binary_fails_job() {
            let dir = TempDir::new().unwrap();
            let runner = JobRunner::new(
                Arc::new(JobRegistry::new()),
                Arc::new(YtDlpFetcher::new(dir.path().join("missing").to_string_lossy())),
            );
            let id = runner
                .submit(WorkSpec::for_video(dir.path(), "abc123", "Song"))
                .unwrap();

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Failed);
            assert!(job.error.unwrap().starts_with("failed to launch fetcher"));
        }

        #[tokio::test]
        async fn test_cancel_while_streaming() {
            let dir = TempDir::new().unwrap();
            let (runner, id) = submit(
                &dir,
                "while true; do\n\
                   echo '[sporldl] downloading| 1.0%|NA'\n\
                   sleep 0.05\n\
                 done",
            );

            wait_until(&runner, &id, |job| job.percent > 0.0).await;
            runner.cancel(&id).unwrap();

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Failed);
            assert_eq!(job.error.as_deref(), Some("cancelled"));
        }

        #[tokio::test]
        async fn test_cancel_during_silent_post_processing() {
            let dir = TempDir::new().unwrap();
            let (runner, id) = submit(
                &dir,
                "echo '[sporldl] finished|100.0%|NA'\n\
                 exec sleep 5 >/dev/null",
            );

            wait_until(&runner, &id, |job| job.transferred).await;
            let started = Instant::now();
            runner.cancel(&id).unwrap();

            let job = wait_terminal(&runner, &id).await;
            assert_eq!(job.state, JobState::Failed);
            assert_eq!(job.error.as_deref(), Some("cancelled"));
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_search_reads_json_payload() {
            let dir = TempDir::new().unwrap();
            let fetcher = fake_ytdlp(
                &dir,
                "echo '{\"entries\": [null, {\"id\": \"abc123\", \"title\": \"Song\", \"duration\": 212.0}]}'",
            );

            let entries = fetcher.search("Song Band", 1).await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].id.as_deref(), Some("abc123"));
            assert_eq!(entries[0].duration, Some(212.0));
        }

        #[tokio::test]
        async fn test_search_failure_uses_stderr() {
            let dir = TempDir::new().unwrap();
            let fetcher = fake_ytdlp(&dir, "echo 'ERROR: network down' >&2\nexit 1");

            match fetcher.search("Song Band", 1).await {
                Err(FetchError::Failed(message)) => assert_eq!(message, "ERROR: network down"),
                other => panic!("unexpected search outcome: {:?}", other.map(|e| e.len())),
            }
        }
    }
}
