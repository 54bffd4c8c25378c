//! Chunks and jobs

use std::sync::Arc;

/// An ordered, bounded slice of the identifier set sent in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Vec<String>);

impl Chunk {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_ids(self) -> Vec<String> {
        self.0
    }

    /// Halve the chunk: the first half gets `ceil(n/2)` identifiers, the
    /// second `floor(n/2)`, both in original order.
    ///
    /// Chunks with fewer than two identifiers cannot be split and are
    /// handed back unchanged.
    pub fn split(self) -> Result<(Chunk, Chunk), Chunk> {
        if self.0.len() < 2 {
            return Err(self);
        }

        let mut first = self.0;
        let second = first.split_off(first.len().div_ceil(2));
        Ok((Chunk(first), Chunk(second)))
    }
}

/// One logical unit of fetch work.
///
/// `index` is assigned once at partition time. Retry children created by
/// [`Job::split`] keep it, so everything a job and its descendants fetch is
/// attributed to the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub index: usize,
    pub filter_field: Arc<str>,
    pub chunk: Chunk,
    /// Number of splits between this job and the partitioned original
    pub depth: u32,
}

impl Job {
    pub fn new(index: usize, filter_field: Arc<str>, chunk: Chunk) -> Self {
        Self {
            index,
            filter_field,
            chunk,
            depth: 0,
        }
    }

    /// Two children at `depth + 1` covering the halves of this job's chunk.
    pub fn split(self) -> Result<(Job, Job), Job> {
        let Job {
            index,
            filter_field,
            chunk,
            depth,
        } = self;

        match chunk.split() {
            Ok((first, second)) => Ok((
                Job {
                    index,
                    filter_field: Arc::clone(&filter_field),
                    chunk: first,
                    depth: depth + 1,
                },
                Job {
                    index,
                    filter_field,
                    chunk: second,
                    depth: depth + 1,
                },
            )),
            Err(chunk) => Err(Job {
                index,
                filter_field,
                chunk,
                depth,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn chunk(n: usize) -> Chunk {
        Chunk::new((0..n).map(|i| format!("ENST{:04}", i)).collect())
    }

    #[test]
    fn test_split_sizes_are_ceil_and_floor() {
        for n in 2..=64 {
            let original = chunk(n);
            let (first, second) = original.clone().split().unwrap();

            assert_eq!(first.len(), n.div_ceil(2), "first half for n={}", n);
            assert_eq!(second.len(), n / 2, "second half for n={}", n);

            let mut rejoined = first.into_ids();
            rejoined.extend(second.into_ids());
            assert_eq!(rejoined, original.into_ids());
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = chunk(7).split().unwrap();
        let b = chunk(7).split().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_identifier_cannot_split() {
        let single = chunk(1);
        assert_eq!(single.clone().split().unwrap_err(), single);
        assert!(chunk(0).split().is_err());
    }

    #[test]
    fn test_job_split_keeps_index_and_increments_depth() {
        let job = Job::new(4, Arc::from("ensembl_transcript_id"), chunk(5));
        let (first, second) = job.split().unwrap();

        assert_eq!((first.index, first.depth, first.chunk.len()), (4, 1, 3));
        assert_eq!((second.index, second.depth, second.chunk.len()), (4, 1, 2));
        assert_eq!(&*second.filter_field, "ensembl_transcript_id");
    }

    #[test]
    fn test_job_split_hands_back_unsplittable_job() {
        let job = Job {
            depth: 2,
            ..Job::new(9, Arc::from("f"), chunk(1))
        };
        let back = job.clone().split().unwrap_err();
        assert_eq!(back, job);
    }
}
