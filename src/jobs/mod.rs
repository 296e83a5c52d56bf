//! Background job tracker.
//!
//! A download request becomes a [`Job`] in the [`JobRegistry`]. The
//! [`JobRunner`] executes it on its own tokio task and the fetcher reports
//! progress through a [`ProgressSink`], which the [`ProgressReporter`]
//! turns into field updates. Clients poll the registry by job id until the
//! job reaches `Done` or `Failed`.

mod registry;
mod reporter;
mod runner;
mod types;

pub use registry::{JobError, JobRegistry, MIN_SWEEP_INTERVAL};
pub use reporter::{CancelFlag, ProgressEvent, ProgressReporter, ProgressSink};
pub use runner::JobRunner;
pub use types::{Job, JobId, JobState};
