//! Remote tabular service (BioMart)
//!
//! The engine talks to the service only through [`MartSource`], so the
//! worker and orchestrator can be exercised against scripted sources in
//! tests and against [`BiomartClient`] in production.
//!
//! The service has an undocumented maximum request size. Oversized requests
//! come back as an HTTP error status with no further detail, which is why
//! [`SourceError::Rejected`] is kept separate from every other failure: it is
//! the only class the worker tries to recover from by splitting.

pub mod client;
pub mod parser;
pub mod query;

use async_trait::async_trait;
use martsync_common::types::Row;
use std::sync::Arc;

pub use client::BiomartClient;
pub use parser::TsvRowParser;
pub use query::query_document;

/// One filtered query: rows whose `filter` field is in `values`, projected
/// onto `attributes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MartQuery {
    pub filter: Arc<str>,
    pub values: Vec<String>,
    pub attributes: Arc<[String]>,
}

impl MartQuery {
    pub fn new(filter: Arc<str>, values: Vec<String>, attributes: Arc<[String]>) -> Self {
        Self {
            filter,
            values,
            attributes,
        }
    }

    /// Number of fields every returned row must have
    pub fn arity(&self) -> usize {
        self.attributes.len()
    }
}

/// Failures reported by a [`MartSource`]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The service refused the request; possibly too many identifiers.
    #[error("Request rejected by mart service (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service could not be reached or the response stream broke.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered, but not with a usable table.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SourceError::Transport(err.into())
    }

    /// Whether splitting the request might make it succeed
    pub fn is_rejected(&self) -> bool {
        matches!(self, SourceError::Rejected { .. })
    }
}

/// A queryable tabular annotation service
#[async_trait]
pub trait MartSource: Send + Sync {
    /// Run one query and return every row of the response.
    ///
    /// Implementations must either return the complete response or an
    /// error; a partially read response is never returned as rows.
    async fn query(&self, query: &MartQuery) -> Result<Vec<Row>, SourceError>;
}

#[async_trait]
impl<S: MartSource + ?Sized> MartSource for Arc<S> {
    async fn query(&self, query: &MartQuery) -> Result<Vec<Row>, SourceError> {
        (**self).query(query).await
    }
}
