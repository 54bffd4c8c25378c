//! martsync ingest library
//!
//! Bulk-fetches per-transcript annotations from a BioMart service and
//! replaces local SQLite tables with the result.
//!
//! # Pipeline
//!
//! - **Partition**: the identifier set is cut into chunks, and chunks into
//!   waves of concurrent jobs ([`partition`])
//! - **Fetch**: each job is sent to the mart; rejected chunks are halved and
//!   retried up to a depth limit ([`worker`], [`orchestrator`])
//! - **Store**: once every wave succeeded, the table is replaced in one
//!   transaction ([`storage`])
//!
//! # Example
//!
//! ```no_run
//! use martsync_ingest::catalog::{AnnotationPlan, DomainKind, Genome};
//! use martsync_ingest::config::SyncConfig;
//! use martsync_ingest::mart::BiomartClient;
//! use martsync_ingest::storage::AnnotationStore;
//! use martsync_ingest::sync::{AnnotationSync, SyncOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::load()?;
//!     let client = Arc::new(BiomartClient::new(&config.mart)?);
//!     let store = AnnotationStore::connect(&config.database_url).await?;
//!     let plan = AnnotationPlan::domain(Genome::GRCh38, DomainKind::Pfam)?;
//!
//!     let ids = vec!["ENST00000335137".to_string()];
//!     let report = AnnotationSync::new(client, store, plan)
//!         .with_options(SyncOptions::from(&config))
//!         .fetch_and_store(&ids, config.parallelism)
//!         .await?;
//!     println!("stored {} rows", report.rows_stored);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod job;
pub mod mart;
pub mod orchestrator;
pub mod partition;
pub mod storage;
pub mod sync;
pub mod worker;

pub use catalog::{AnnotationPlan, DomainKind, Genome};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use mart::{BiomartClient, MartQuery, MartSource, SourceError};
pub use storage::AnnotationStore;
pub use sync::{AnnotationSync, SyncOptions, SyncReport};
