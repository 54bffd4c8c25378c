//! Wave-by-wave fetch orchestration
//!
//! Each wave's jobs run concurrently on a [`JoinSet`]. The next wave starts
//! only after every task of the current one has finished, so at most one
//! wave's worth of requests (plus their sequential retries) is in flight.

use crate::error::{Result, SyncError};
use crate::mart::MartSource;
use crate::partition::Wave;
use crate::worker::{FetchWorker, JobOutput};
use indicatif::{ProgressBar, ProgressStyle};
use martsync_common::types::Row;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Everything fetched in one cycle, ordered by job index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub rows: Vec<Row>,
    pub jobs: usize,
    pub waves: usize,
    pub queries: usize,
    pub splits: usize,
}

/// Drives waves of jobs through a shared [`FetchWorker`]
pub struct FetchOrchestrator<S: ?Sized> {
    worker: Arc<FetchWorker<S>>,
    progress: ProgressBar,
}

impl<S: MartSource + ?Sized + 'static> FetchOrchestrator<S> {
    pub fn new(worker: FetchWorker<S>) -> Self {
        Self {
            worker: Arc::new(worker),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report completed waves on `bar`; its length is set when a run starts.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    pub fn progress(&self) -> &ProgressBar {
        &self.progress
    }

    /// Run every wave in order and merge the rows by job index.
    ///
    /// A failing job does not cancel its siblings: the whole wave is joined,
    /// then the failure with the lowest job index is returned and no later
    /// wave is started.
    pub async fn run(&self, waves: Vec<Wave>) -> Result<FetchOutcome> {
        let total_waves = waves.len();
        self.progress.set_length(total_waves as u64);

        let mut by_index: BTreeMap<usize, Vec<Row>> = BTreeMap::new();
        let mut outcome = FetchOutcome::default();

        for (wave_number, wave) in waves.into_iter().enumerate() {
            let width = wave.len();
            let mut tasks = JoinSet::new();

            for job in wave {
                let worker = Arc::clone(&self.worker);
                tasks.spawn(async move { worker.run(job).await });
            }

            let mut completed: Vec<JobOutput> = Vec::with_capacity(width);
            let mut failures: Vec<SyncError> = Vec::new();

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(output)) => completed.push(output),
                    Ok(Err(e)) => failures.push(e),
                    Err(e) => failures.push(SyncError::WorkerAborted(e.to_string())),
                }
            }

            if let Some(first) = first_failure(failures) {
                error!(
                    wave = wave_number + 1,
                    waves = total_waves,
                    job_index = ?first.job_index(),
                    "Fetch wave failed: {}",
                    first
                );
                self.progress.abandon();
                return Err(first);
            }

            for output in completed {
                outcome.queries += output.queries;
                outcome.splits += output.splits;
                if by_index.insert(output.index, output.rows).is_some() {
                    return Err(SyncError::DuplicateJob(output.index));
                }
            }
            outcome.jobs += width;
            outcome.waves += 1;

            self.progress.inc(1);
            info!(
                wave = wave_number + 1,
                waves = total_waves,
                jobs = width,
                "Fetch wave complete"
            );
        }

        self.progress.finish();
        outcome.rows = by_index.into_values().flatten().collect();
        Ok(outcome)
    }
}

/// Lowest job index wins; failures without a job sort last.
fn first_failure(failures: Vec<SyncError>) -> Option<SyncError> {
    failures
        .into_iter()
        .min_by_key(|e| e.job_index().unwrap_or(usize::MAX))
}

/// Progress bar counting completed waves
pub fn wave_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} waves ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}
