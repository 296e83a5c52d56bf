//! Normalization of fetcher progress events into job updates.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::utils;

use super::{registry::JobRegistry, types::Job, types::JobId};

/// A discrete status notification emitted by a fetcher while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Bytes are flowing. `percent` is the fetcher's raw rendering, e.g.
    /// `" 45.2%"`.
    Downloading {
        percent: String,
        eta: Option<u64>,
    },
    /// The transfer finished. Post-processing may still follow.
    Finished,
    /// The fetcher gave up on the transfer.
    Error { message: Option<String> },
}

impl ProgressEvent {
    /// Builds an event from the fetcher's own status vocabulary. Unknown
    /// statuses yield `None`.
    pub fn from_status(status: &str, percent: Option<&str>, eta: Option<&str>) -> Option<Self> {
        match status.trim() {
            "downloading" => Some(ProgressEvent::Downloading {
                percent: percent.unwrap_or_default().to_string(),
                eta: eta.and_then(utils::parse_eta),
            }),
            "finished" => Some(ProgressEvent::Finished),
            "error" => Some(ProgressEvent::Error { message: None }),
            _ => None,
        }
    }
}

/// Applies progress events to job records.
///
/// The reporter never moves a job into a terminal state: `finished` only
/// means the transfer is over, and failures are recorded by the runner
/// once the fetcher call returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressReporter;

impl ProgressReporter {
    pub fn apply(&self, job: &mut Job, event: &ProgressEvent) {
        if job.state.is_terminal() {
            return;
        }

        match event {
            ProgressEvent::Downloading { percent, eta } => {
                job.start();
                // a cosmetic parse failure must not fail the job
                if let Some(value) = utils::parse_percent(percent) {
                    job.advance(value);
                }
                job.eta_seconds = *eta;
            }
            ProgressEvent::Finished => {
                job.start();
                job.advance(100.0);
                job.eta_seconds = Some(0);
                job.transferred = true;
            }
            ProgressEvent::Error { message } => {
                job.pending_error = Some(
                    message
                        .clone()
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| "Download failed".to_string()),
                );
            }
        }
    }
}

/// Cooperative cancellation flag shared between a runner and a fetcher.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-job handle through which a fetcher reports progress.
///
/// Events are applied synchronously on the caller's stack, so they land in
/// the registry in exactly the order they were emitted.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    job_id: JobId,
    registry: Arc<JobRegistry>,
    reporter: ProgressReporter,
    cancel: CancelFlag,
}

impl ProgressSink {
    pub fn new(job_id: impl Into<JobId>, registry: Arc<JobRegistry>, cancel: CancelFlag) -> Self {
        Self {
            job_id: job_id.into(),
            registry,
            reporter: ProgressReporter,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn emit(&self, event: ProgressEvent) {
        let reporter = self.reporter;
        if let Err(e) = self
            .registry
            .update(&self.job_id, |job| reporter.apply(job, &event))
        {
            tracing::debug!(job_id = %self.job_id, "dropping progress event: {}", e);
        }
    }

    /// Fetchers poll this while they work and abort when set.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobState;

    fn downloading(percent: &str, eta: Option<u64>) -> ProgressEvent {
        ProgressEvent::Downloading {
            percent: percent.to_string(),
            eta,
        }
    }

    #[test]
    fn test_downloading_updates_percent_and_eta() {
        let mut job = Job::new("a");
        ProgressReporter.apply(&mut job, &downloading(" 45.2%", Some(12)));
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.percent, 45.2);
        assert_eq!(job.eta_seconds, Some(12));
    }

    #[test]
    fn test_unparsable_percent_keeps_previous_value() {
        let mut job = Job::new("a");
        ProgressReporter.apply(&mut job, &downloading("30%", Some(5)));
        ProgressReporter.apply(&mut job, &downloading("Unknown %", None));
        assert_eq!(job.percent, 30.0);
        assert_eq!(job.eta_seconds, None);
        assert_eq!(job.state, JobState::Running);
    }

    #[test]
    fn test_percent_stays_in_range() {
        let mut job = Job::new("a");
        for raw in ["-20%", "12%", "400%", "7%", "nan%", "inf%"] {
            ProgressReporter.apply(&mut job, &downloading(raw, None));
            assert!((0.0..=100.0).contains(&job.percent), "{raw} -> {}", job.percent);
        }
        assert_eq!(job.percent, 100.0);
    }

    #[test]
    fn test_finished_does_not_complete_job() {
        let mut job = Job::new("a");
        ProgressReporter.apply(&mut job, &downloading("80%", Some(3)));
        ProgressReporter.apply(&mut job, &ProgressEvent::Finished);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.percent, 100.0);
        assert_eq!(job.eta_seconds, Some(0));
        assert!(job.transferred);
    }

    #[test]
    fn test_error_event_does_not_fail_job() {
        let mut job = Job::new("a");
        job.start();
        ProgressReporter.apply(&mut job, &ProgressEvent::Error { message: None });
        assert_eq!(job.state, JobState::Running);
        assert!(job.error.is_none());
        assert_eq!(job.pending_error.as_deref(), Some("Download failed"));
    }

    #[test]
    fn test_terminal_jobs_ignore_events() {
        let mut job = Job::new("a");
        job.complete();
        let before = job.clone();
        ProgressReporter.apply(&mut job, &downloading("10%", Some(99)));
        ProgressReporter.apply(&mut job, &ProgressEvent::Error { message: None });
        assert_eq!(job, before);
    }

    #[test]
    fn test_from_status() {
        assert_eq!(
            ProgressEvent::from_status("downloading", Some(" 5.0%"), Some("17")),
            Some(downloading(" 5.0%", Some(17)))
        );
        assert_eq!(
            ProgressEvent::from_status("downloading", None, Some("NA")),
            Some(downloading("", None))
        );
        assert_eq!(
            ProgressEvent::from_status("finished", None, None),
            Some(ProgressEvent::Finished)
        );
        assert_eq!(
            ProgressEvent::from_status("error", None, None),
            Some(ProgressEvent::Error { message: None })
        );
        assert_eq!(ProgressEvent::from_status("postprocessing", None, None), None);
    }

    #[test]
    fn test_sink_applies_events_in_order() {
        let registry = Arc::new(JobRegistry::new());
        registry.create("job").unwrap();
        let sink = ProgressSink::new("job", Arc::clone(&registry), CancelFlag::new());

        sink.emit(downloading("10%", Some(9)));
        sink.emit(downloading("55.5%", Some(4)));
        let job = registry.get("job").unwrap();
        assert_eq!(job.percent, 55.5);
        assert_eq!(job.eta_seconds, Some(4));

        sink.emit(ProgressEvent::Finished);
        assert!(registry.get("job").unwrap().transferred);
    }

    #[test]
    fn test_sink_for_evicted_job_is_harmless() {
        let registry = Arc::new(JobRegistry::new());
        let sink = ProgressSink::new("gone", Arc::clone(&registry), CancelFlag::new());
        sink.emit(ProgressEvent::Finished);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let registry = Arc::new(JobRegistry::new());
        let sink = ProgressSink::new("job", registry, flag.clone());
        assert!(!sink.is_cancelled());
        flag.cancel();
        assert!(sink.is_cancelled());
    }
}
