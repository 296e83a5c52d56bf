//! Process-wide store of job records.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::types::{Job, JobId};

/// Used by [`JobRegistry::spawn_eviction`] when asked for a zero interval.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {0} already exists")]
    Duplicate(JobId),
}

/// Thread-safe map from job id to job record.
///
/// The lock is held for a single read or a single mutation and never
/// across an `.await`, so polling never waits on a download.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh `Queued` record.
    pub fn create(&self, id: impl Into<JobId>) -> Result<Job, JobError> {
        let id = id.into();
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&id) {
            return Err(JobError::Duplicate(id));
        }
        let job = Job::new(id.clone());
        jobs.insert(id, job.clone());
        Ok(job)
    }

    /// Returns a snapshot of the record.
    pub fn get(&self, id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Applies `mutator` to the record while holding the write lock.
    pub fn update<F, R>(&self, id: &str, mutator: F) -> Result<R, JobError>
    where
        F: FnOnce(&mut Job) -> R,
    {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        Ok(mutator(job))
    }

    /// Drops terminal records that finished more than `age` ago. Queued and
    /// running jobs are always kept.
    pub fn evict_older_than(&self, age: Duration) -> usize {
        let Ok(age) = chrono::Duration::from_std(age) else {
            return 0;
        };
        // a ttl reaching past the calendar range makes nothing old enough
        let Some(cutoff) = Utc::now().checked_sub_signed(age) else {
            return 0;
        };
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) if job.state.is_terminal() => finished_at > cutoff,
            _ => true,
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Starts a background task that evicts stale terminal jobs every
    /// `interval`. A zero interval falls back to [`MIN_SWEEP_INTERVAL`].
    pub fn spawn_eviction(self: &Arc<Self>, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = if interval.is_zero() {
            tracing::warn!("zero sweep interval, using {:?}", MIN_SWEEP_INTERVAL);
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_older_than(ttl);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = registry.len(), "evicted finished jobs");
                }
            }
        })
    }
}
