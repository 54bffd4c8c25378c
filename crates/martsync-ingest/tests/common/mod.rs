//! Shared helpers for martsync-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use martsync_common::types::Row;
use martsync_ingest::mart::{MartQuery, MartSource, SourceError};
use martsync_ingest::storage::AnnotationStore;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type RejectRule = Box<dyn Fn(&MartQuery) -> bool + Send + Sync>;

/// In-process mart that answers one domain row per identifier.
///
/// Rejection, transport failures, placeholder rows and latency are
/// scripted per test. Every request is recorded.
pub struct ScriptedSource {
    reject: RejectRule,
    transport_failure_on: HashSet<String>,
    placeholders: HashSet<String>,
    latency: Duration,
    calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            reject: Box::new(|_| false),
            transport_failure_on: HashSet::new(),
            placeholders: HashSet::new(),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(mut self, rule: impl Fn(&MartQuery) -> bool + Send + Sync + 'static) -> Self {
        self.reject = Box::new(rule);
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.transport_failure_on.insert(id.to_string());
        self
    }

    /// Answer `id` with an empty domain id, as the mart does for transcripts
    /// without annotations.
    pub fn placeholder_for(mut self, id: &str) -> Self {
        self.placeholders.insert(id.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Chunk sizes of every request, in arrival order
    pub fn request_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MartSource for ScriptedSource {
    async fn query(&self, query: &MartQuery) -> Result<Vec<Row>, SourceError> {
        self.calls.lock().unwrap().push(query.values.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if query
            .values
            .iter()
            .any(|id| self.transport_failure_on.contains(id))
        {
            return Err(SourceError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        if (self.reject)(query) {
            return Err(SourceError::Rejected {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }

        Ok(query.values.iter().map(|id| self.row_for(id)).collect())
    }
}

impl ScriptedSource {
    fn row_for(&self, id: &str) -> Row {
        if self.placeholders.contains(id) {
            Row::from_iter([id, "", "", ""])
        } else {
            domain_row(id)
        }
    }
}

/// The row [`ScriptedSource`] answers for an annotated identifier
pub fn domain_row(id: &str) -> Row {
    Row::from_iter([
        id.to_string(),
        format!("PF{}", &id[4..]),
        "1".to_string(),
        "100".to_string(),
    ])
}

/// `n` transcript identifiers `ENST0000`, `ENST0001`, ...
pub fn transcript_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("ENST{:04}", i)).collect()
}

/// Fresh in-memory database; one connection so every query sees it.
pub async fn memory_store() -> AnnotationStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    AnnotationStore::from_pool(pool)
}
