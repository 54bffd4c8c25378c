//! martsync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, validation, and logging for the martsync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: validation and parse errors shared by all members
//! - **Types**: annotation rows, SQL-safe identifiers and table layouts
//! - **Logging**: tracing subscriber setup driven by environment variables
//!
//! # Example
//!
//! ```no_run
//! use martsync_common::types::{Row, TableSpec};
//!
//! fn main() -> martsync_common::Result<()> {
//!     let spec = TableSpec::new(
//!         "GRCh38_pfam",
//!         ["ensembl_transcript_id", "pfam", "pfam_start", "pfam_end"],
//!     )?;
//!     let row = Row::from_tsv_line("ENST00000335137\tPF00001\t10\t300", spec.arity())?;
//!     assert_eq!(row.identifier(), "ENST00000335137");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
