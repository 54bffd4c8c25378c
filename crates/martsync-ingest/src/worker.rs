//! Fetch worker with adaptive split-and-retry
//!
//! A worker owns one job for its whole lifetime. When the service rejects a
//! chunk, the worker halves it and queues both halves on a local work stack,
//! so all rows for the job's index are merged by a single owner before they
//! are handed to the orchestrator.

use crate::error::{Result, SyncError};
use crate::job::Job;
use crate::mart::{MartQuery, MartSource, SourceError};
use martsync_common::types::Row;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Rows fetched for one job index, merged across every retry descendant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub index: usize,
    pub rows: Vec<Row>,
    /// Requests issued, including rejected ones
    pub queries: usize,
    /// Times a chunk was halved
    pub splits: usize,
}

/// Runs jobs against a [`MartSource`]
pub struct FetchWorker<S: ?Sized> {
    source: Arc<S>,
    attributes: Arc<[String]>,
    max_split_depth: u32,
}

impl<S: MartSource + ?Sized> FetchWorker<S> {
    pub fn new(source: Arc<S>, attributes: Arc<[String]>, max_split_depth: u32) -> Self {
        Self {
            source,
            attributes,
            max_split_depth,
        }
    }

    pub fn max_split_depth(&self) -> u32 {
        self.max_split_depth
    }

    /// Fetch every row for `job`, splitting rejected chunks until they pass
    /// or the depth limit is reached.
    ///
    /// Halves are processed first-half first, so rows come back in chunk
    /// order regardless of how often the job was split.
    pub async fn run(&self, job: Job) -> Result<JobOutput> {
        let index = job.index;
        let mut pending = vec![job];
        let mut output = JobOutput {
            index,
            rows: Vec::new(),
            queries: 0,
            splits: 0,
        };

        while let Some(job) = pending.pop() {
            output.queries += 1;

            let err = match self.attempt(&job).await {
                Ok(mut rows) => {
                    output.rows.append(&mut rows);
                    continue;
                },
                Err(err) => err,
            };

            if !err.is_rejected() {
                return Err(SyncError::Source {
                    index,
                    depth: job.depth,
                    chunk: job.chunk.into_ids(),
                    source: err,
                });
            }

            if job.depth >= self.max_split_depth {
                warn!(
                    job_index = index,
                    depth = job.depth,
                    chunk_len = job.chunk.len(),
                    "Chunk still rejected at maximum split depth"
                );
                return Err(SyncError::RetryExhausted {
                    index,
                    depth: job.depth,
                    chunk: job.chunk.into_ids(),
                    source: err,
                });
            }

            match job.split() {
                Ok((first, second)) => {
                    debug!(
                        job_index = index,
                        depth = first.depth,
                        first_len = first.chunk.len(),
                        second_len = second.chunk.len(),
                        error = %err,
                        "Chunk rejected, splitting and retrying"
                    );
                    output.splits += 1;
                    pending.push(second);
                    pending.push(first);
                },
                Err(job) => return Err(unsplittable(job, err)),
            }
        }

        Ok(output)
    }

    #[instrument(
        name = "fetch_attempt",
        skip(self, job),
        fields(job_index = job.index, depth = job.depth, chunk_len = job.chunk.len())
    )]
    async fn attempt(&self, job: &Job) -> std::result::Result<Vec<Row>, SourceError> {
        let query = MartQuery::new(
            Arc::clone(&job.filter_field),
            job.chunk.ids().to_vec(),
            Arc::clone(&self.attributes),
        );
        self.source.query(&query).await
    }
}

fn unsplittable(job: Job, source: SourceError) -> SyncError {
    warn!(
        job_index = job.index,
        depth = job.depth,
        "Service rejected a single identifier"
    );
    SyncError::Unsplittable {
        index: job.index,
        depth: job.depth,
        identifier: job.chunk.into_ids().into_iter().next().unwrap_or_default(),
        source,
    }
}
