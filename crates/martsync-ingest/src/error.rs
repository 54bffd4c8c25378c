//! Error types for fetch cycles

use crate::mart::SourceError;

/// Result type for fetch and sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// How many identifiers of a failing chunk to spell out in messages
const PREVIEW_IDS: usize = 5;

/// Fatal failures of a fetch cycle.
///
/// Every variant aborts the whole cycle; the destination table is only
/// touched after all fetching has succeeded.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The service failed in a way splitting cannot fix (transport, protocol).
    #[error("Job {index} failed at depth {depth} on {}: {source}", preview(.chunk))]
    Source {
        index: usize,
        depth: u32,
        chunk: Vec<String>,
        #[source]
        source: SourceError,
    },

    /// The service kept rejecting a chunk after the maximum number of splits.
    #[error("Job {index} still rejected after {depth} splits on {}: {source}", preview(.chunk))]
    RetryExhausted {
        index: usize,
        depth: u32,
        chunk: Vec<String>,
        #[source]
        source: SourceError,
    },

    /// The service rejected a single identifier, which cannot be split further.
    #[error("Job {index} rejected for single identifier '{identifier}' at depth {depth}: {source}")]
    Unsplittable {
        index: usize,
        depth: u32,
        identifier: String,
        #[source]
        source: SourceError,
    },

    #[error("Worker task aborted: {0}")]
    WorkerAborted(String),

    #[error("Job index {0} produced more than one result")]
    DuplicateJob(usize),

    #[error("Storage error on table {table}: {source}")]
    Storage {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Common(#[from] martsync_common::Error),
}

impl SyncError {
    /// Index of the job that failed, when the failure belongs to one.
    pub fn job_index(&self) -> Option<usize> {
        match self {
            SyncError::Source { index, .. }
            | SyncError::RetryExhausted { index, .. }
            | SyncError::Unsplittable { index, .. }
            | SyncError::DuplicateJob(index) => Some(*index),
            _ => None,
        }
    }

    /// Identifiers of the exact chunk that could not be fetched.
    pub fn failed_identifiers(&self) -> Option<Vec<&str>> {
        match self {
            SyncError::Source { chunk, .. } | SyncError::RetryExhausted { chunk, .. } => {
                Some(chunk.iter().map(String::as_str).collect())
            },
            SyncError::Unsplittable { identifier, .. } => Some(vec![identifier.as_str()]),
            _ => None,
        }
    }
}

fn preview(chunk: &[String]) -> String {
    let shown = chunk
        .iter()
        .take(PREVIEW_IDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    if chunk.len() > PREVIEW_IDS {
        format!("{} identifiers [{}, ...]", chunk.len(), shown)
    } else {
        format!("{} identifiers [{}]", chunk.len(), shown)
    }
}
