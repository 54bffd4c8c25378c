//! Error types shared across martsync crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, Error>;

/// Validation and parse failures for shared types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid SQL identifier: '{0}' (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidIdentifier(String),

    #[error("Row arity mismatch: expected {expected} fields, got {actual} in line '{line}'")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("Invalid table layout: {0}")]
    InvalidTable(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
