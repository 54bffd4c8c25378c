//! One fetch cycle: partition, fetch, replace
//!
//! [`AnnotationSync::fetch_and_store`] is the entry point callers use. It
//! fetches every row for an identifier set and only then replaces the
//! destination table, so a failed cycle never touches stored data.

use crate::catalog::AnnotationPlan;
use crate::config::{SyncConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAX_SPLIT_DEPTH};
use crate::error::Result;
use crate::mart::MartSource;
use crate::orchestrator::{wave_progress_bar, FetchOrchestrator};
use crate::partition::Partitioner;
use crate::storage::AnnotationStore;
use crate::worker::FetchWorker;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// Tuning for fetch cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub max_split_depth: u32,
    pub show_progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_split_depth: DEFAULT_MAX_SPLIT_DEPTH,
            show_progress: false,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_split_depth: config.max_split_depth,
            show_progress: config.show_progress,
        }
    }
}

/// Summary of a successful fetch cycle
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub table: String,
    pub identifiers: usize,
    pub jobs: usize,
    pub waves: usize,
    pub queries: usize,
    pub splits: usize,
    pub rows_fetched: usize,
    pub rows_stored: u64,
    pub rows_dropped: u64,
    pub rows_replaced: u64,
    pub elapsed_secs: f64,
}

/// Keeps one annotation table in sync with a mart
pub struct AnnotationSync<S: ?Sized> {
    source: Arc<S>,
    store: AnnotationStore,
    plan: AnnotationPlan,
    options: SyncOptions,
}

impl<S: MartSource + ?Sized + 'static> AnnotationSync<S> {
    pub fn new(source: Arc<S>, store: AnnotationStore, plan: AnnotationPlan) -> Self {
        Self {
            source,
            store,
            plan,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plan(&self) -> &AnnotationPlan {
        &self.plan
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Fetch annotations for `ids`, at most `width` requests at a time, and
    /// replace the plan's table with them.
    ///
    /// On error the table keeps whatever it held before the call.
    #[instrument(skip(self, ids), fields(table = %self.plan.table.name(), identifiers = ids.len()))]
    pub async fn fetch_and_store(&self, ids: &[String], width: usize) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();

        let partitioner = Partitioner::new(self.options.batch_size, width)?;
        let waves = partitioner.partition(ids, &self.plan.filter_field);
        info!(
            %run_id,
            waves = waves.len(),
            batch_size = partitioner.batch_size(),
            width = partitioner.width(),
            "Starting fetch cycle"
        );

        let worker = FetchWorker::new(
            Arc::clone(&self.source),
            Arc::clone(&self.plan.attributes),
            self.options.max_split_depth,
        );
        let progress = if self.options.show_progress {
            wave_progress_bar(&format!("Fetching {}", self.plan.table.name()))
        } else {
            ProgressBar::hidden()
        };
        let outcome = FetchOrchestrator::new(worker)
            .with_progress(progress)
            .run(waves)
            .await?;

        let rows_fetched = outcome.rows.len();
        self.store.ensure_table(&self.plan.table).await?;
        let stats = self.store.replace_rows(&self.plan.table, outcome.rows).await?;

        let report = SyncReport {
            run_id,
            started_at,
            table: self.plan.table.name().to_string(),
            identifiers: ids.len(),
            jobs: outcome.jobs,
            waves: outcome.waves,
            queries: outcome.queries,
            splits: outcome.splits,
            rows_fetched,
            rows_stored: stats.rows_inserted,
            rows_dropped: stats.rows_dropped,
            rows_replaced: stats.rows_deleted,
            elapsed_secs: timer.elapsed().as_secs_f64(),
        };

        info!(
            %run_id,
            queries = report.queries,
            splits = report.splits,
            rows_stored = report.rows_stored,
            rows_dropped = report.rows_dropped,
            "Fetch cycle complete in {:.2}s",
            report.elapsed_secs
        );
        Ok(report)
    }
}
