//! Splits an identifier set into waves of jobs

use crate::error::{Result, SyncError};
use crate::job::{Chunk, Job};
use std::sync::Arc;

/// Jobs launched together and joined before the next wave starts
pub type Wave = Vec<Job>;

/// Two-level partitioning: chunks of at most `batch_size` identifiers,
/// grouped into waves of at most `width` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    batch_size: usize,
    width: usize,
}

impl Partitioner {
    pub fn new(batch_size: usize, width: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SyncError::Config("batch size must be greater than 0".to_string()));
        }
        if width == 0 {
            return Err(SyncError::Config("parallelism must be greater than 0".to_string()));
        }
        Ok(Self { batch_size, width })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cover `ids` exactly once, in order.
    ///
    /// Job indices run from 0 in chunk order. An empty set yields no waves.
    pub fn partition(&self, ids: &[String], filter_field: &Arc<str>) -> Vec<Wave> {
        let mut jobs = ids
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, ids)| Job::new(index, Arc::clone(filter_field), Chunk::new(ids.to_vec())))
            .peekable();

        let per_wave = self.batch_size.saturating_mul(self.width);
        let mut waves = Vec::with_capacity(ids.len().div_ceil(per_wave));
        while jobs.peek().is_some() {
            waves.push(jobs.by_ref().take(self.width).collect());
        }
        waves
    }
}
