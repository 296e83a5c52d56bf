//! Launches downloads in the background and records their outcome.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::fetcher::{FetchError, MediaFetcher, WorkSpec};

use super::{
    registry::{JobError, JobRegistry},
    reporter::{CancelFlag, ProgressSink},
    types::{Job, JobId},
};

/// Runs one fetcher download per submitted job.
///
/// Every submission gets a fresh id, so two requests for the same video
/// are two independent jobs. Whatever happens inside the fetcher (error or
/// panic) ends up as a terminal state in the registry.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    fetcher: Arc<dyn MediaFetcher>,
    cancels: Arc<Mutex<HashMap<JobId, CancelFlag>>>,
}

impl JobRunner {
    pub fn new(registry: Arc<JobRegistry>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            cancels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Registers a new job and schedules it on the tokio runtime. Returns
    /// as soon as the job is queued.
    pub fn submit(&self, spec: WorkSpec) -> Result<JobId, JobError> {
        let id = Uuid::new_v4().to_string();
        self.registry.create(id.clone())?;

        let cancel = CancelFlag::new();
        self.cancels.lock().insert(id.clone(), cancel.clone());

        tracing::info!(job_id = %id, url = %spec.url, "download queued");

        let registry = Arc::clone(&self.registry);
        let fetcher = Arc::clone(&self.fetcher);
        let cancels = Arc::clone(&self.cancels);
        let job_id = id.clone();
        tokio::spawn(async move {
            execute(&registry, fetcher, &job_id, spec, cancel).await;
            cancels.lock().remove(&job_id);
        });

        Ok(id)
    }

    /// Asks a running download to stop. The job fails with `cancelled` once
    /// the fetcher observes the flag; [`crate::fetcher::YtDlpFetcher`] checks
    /// it on every progress line and at least every 100ms while the child is
    /// silent. A job that completes before that still ends `Done`.
    pub fn cancel(&self, id: &str) -> Result<(), JobError> {
        match self.cancels.lock().get(id) {
            Some(flag) => {
                flag.cancel();
                Ok(())
            }
            // already terminal jobs have nothing left to cancel
            None => self.registry.get(id).map(|_| ()),
        }
    }
}

async fn execute(
    registry: &Arc<JobRegistry>,
    fetcher: Arc<dyn MediaFetcher>,
    job_id: &str,
    spec: WorkSpec,
    cancel: CancelFlag,
) {
    if let Err(e) = registry.update(job_id, Job::start) {
        tracing::warn!(job_id, "job vanished before it started: {}", e);
        return;
    }
    tracing::debug!(job_id, output = %spec.output.display(), "download started");

    let sink = ProgressSink::new(job_id, Arc::clone(registry), cancel);
    let task = tokio::spawn(async move { fetcher.download(&spec, &sink).await });

    let outcome = match task.await {
        Ok(result) => result,
        Err(e) => Err(FetchError::Aborted(e.to_string())),
    };

    let recorded = match outcome {
        Ok(()) => {
            tracing::info!(job_id, "download finished");
            registry.update(job_id, Job::complete)
        }
        Err(e) => {
            tracing::warn!(job_id, "download failed: {}", e);
            registry.update(job_id, |job| job.fail(e.to_string()))
        }
    };

    if let Err(e) = recorded {
        tracing::warn!(job_id, "could not record job outcome: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetcher::SearchEntry,
        jobs::{JobState, ProgressEvent},
    };
    use async_trait::async_trait;
    use std::{path::PathBuf, time::Duration};
    use tokio::sync::Notify;

    enum Script {
        Succeed,
        FailWith(&'static str),
        Panic,
        WaitForCancel,
        Gate(Arc<Notify>),
    }

    struct ScriptedFetcher(Script);

    #[async_trait]
    impl MediaFetcher for ScriptedFetcher {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<SearchEntry>, FetchError> {
            Ok(Vec::new())
        }

        async fn download(
            &self,
            _spec: &WorkSpec,
            progress: &ProgressSink,
        ) -> Result<(), FetchError> {
            match &self.0 {
                Script::Succeed => {
                    progress.emit(ProgressEvent::Downloading {
                        percent: "50%".to_string(),
                        eta: Some(1),
                    });
                    progress.emit(ProgressEvent::Finished);
                    Ok(())
                }
                Script::FailWith(message) => Err(FetchError::Failed(message.to_string())),
                Script::Panic => panic!("fetcher exploded"),
                Script::WaitForCancel => loop {
                    if progress.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                },
                Script::Gate(gate) => {
                    gate.notified().await;
                    Ok(())
                }
            }
        }
    }

    fn spec() -> WorkSpec {
        WorkSpec {
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            output: PathBuf::from("downloads/Song Title.%(ext)s"),
        }
    }

    fn runner(script: Script) -> JobRunner {
        JobRunner::new(Arc::new(JobRegistry::new()), Arc::new(ScriptedFetcher(script)))
    }

    async fn wait_terminal(runner: &JobRunner, id: &str) -> Job {
        for _ in 0..200 {
            let job = runner.registry().get(id).unwrap();
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never finished");
    }

    #[tokio::test]
    async fn test_successful_job_is_done() {
        let runner = runner(Script::Succeed);
        let id = runner.submit(spec()).unwrap();
        let job = wait_terminal(&runner, &id).await;
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.percent, 100.0);
        assert!(job.transferred);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_recorded() {
        let runner = runner(Script::FailWith("ConnectionError: timeout"));
        let id = runner.submit(spec()).unwrap();
        let job = wait_terminal(&runner, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_panicking_fetcher_fails_job() {
        let runner = runner(Script::Panic);
        let id = runner.submit(spec()).unwrap();
        let job = wait_terminal(&runner, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.is_some());
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_for_work() {
        let gate = Arc::new(Notify::new());
        let runner = runner(Script::Gate(Arc::clone(&gate)));
        let id = runner.submit(spec()).unwrap();

        let job = runner.registry().get(&id).unwrap();
        assert!(!job.state.is_terminal());

        gate.notify_one();
        assert_eq!(wait_terminal(&runner, &id).await.state, JobState::Done);
    }

    #[tokio::test]
    async fn test_each_submit_gets_its_own_job() {
        let runner = runner(Script::Succeed);
        let first = runner.submit(spec()).unwrap();
        let second = runner.submit(spec()).unwrap();
        assert_ne!(first, second);
        assert_eq!(runner.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_running_job() {
        let runner = runner(Script::WaitForCancel);
        let id = runner.submit(spec()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        runner.cancel(&id).unwrap();
        let job = wait_terminal(&runner, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_unknown_job() {
        let runner = runner(Script::Succeed);
        assert_eq!(
            runner.cancel("missing"),
            Err(JobError::NotFound("missing".to_string()))
        );
    }
}
