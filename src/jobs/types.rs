//! Types for the background job tracker.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unique identifier of a tracked job (a UUID v4 rendered as a string).
pub type JobId = String;

/// Lifecycle state of a job.
///
/// States only move forward: `Queued -> Running -> {Done, Failed}`. A job
/// that cannot start may go straight from `Queued` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }
}

/// One tracked unit of background work.
///
/// Fields are only changed through the transition methods below so the
/// record can never leave a terminal state or carry an error while not
/// failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub percent: f64,
    pub eta_seconds: Option<u64>,
    pub error: Option<String>,
    /// Raised by the fetcher's `finished` event. Post-processing may still
    /// be running, so this does not mean the job is done.
    pub transferred: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub(crate) pending_error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Queued,
            percent: 0.0,
            eta_seconds: None,
            error: None,
            transferred: false,
            created_at: Utc::now(),
            finished_at: None,
            pending_error: None,
        }
    }

    /// Moves a queued job to `Running`. Returns false if the job had
    /// already left the queue.
    pub fn start(&mut self) -> bool {
        if self.state != JobState::Queued {
            return false;
        }
        self.state = JobState::Running;
        true
    }

    /// Raises the completion estimate. Values are clamped to [0, 100] and
    /// never lower the current percent.
    pub fn advance(&mut self, percent: f64) {
        if self.state.is_terminal() || !percent.is_finite() {
            return;
        }
        self.percent = self.percent.max(percent.clamp(0.0, 100.0));
    }

    pub fn complete(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Done;
        self.percent = 100.0;
        self.eta_seconds = Some(0);
        self.error = None;
        self.pending_error = None;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Marks the job failed with `message`. An empty message falls back to
    /// the reason reported through the progress stream, if any.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let message = message.into();
        let message = if message.trim().is_empty() {
            self.pending_error
                .take()
                .unwrap_or_else(|| "Download failed".to_string())
        } else {
            message
        };
        self.state = JobState::Failed;
        self.eta_seconds = None;
        self.error = Some(message);
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new("a");
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.percent, 0.0);
        assert!(job.error.is_none());
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_transitions_only_move_forward() {
        let mut job = Job::new("a");
        assert!(job.start());
        assert!(!job.start());
        assert!(job.complete());
        assert!(!job.fail("late"));
        assert_eq!(job.state, JobState::Done);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_queued_job_can_fail() {
        let mut job = Job::new("a");
        assert!(job.fail("no such binary"));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("no such binary"));
        assert!(!job.complete());
    }

    #[test]
    fn test_done_implies_full_percent() {
        let mut job = Job::new("a");
        job.start();
        job.advance(12.5);
        job.complete();
        assert_eq!(job.percent, 100.0);
        assert_eq!(job.eta_seconds, Some(0));
    }

    #[test]
    fn test_advance_is_monotonic_and_clamped() {
        let mut job = Job::new("a");
        job.start();
        job.advance(40.0);
        job.advance(10.0);
        assert_eq!(job.percent, 40.0);
        job.advance(250.0);
        assert_eq!(job.percent, 100.0);
        job.advance(f64::NAN);
        assert_eq!(job.percent, 100.0);
    }

    #[test]
    fn test_fail_uses_pending_error_when_message_empty() {
        let mut job = Job::new("a");
        job.pending_error = Some("Download failed: HTTP 403".to_string());
        job.fail("  ");
        assert_eq!(job.error.as_deref(), Some("Download failed: HTTP 403"));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&JobState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(JobState::Failed.as_str(), "failed");
    }
}
