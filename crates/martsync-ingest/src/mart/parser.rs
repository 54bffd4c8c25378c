//! Line parser for TSV mart responses

use super::SourceError;
use martsync_common::types::Row;

/// Marker BioMart puts at the start of a 200 response when the query failed
const QUERY_ERROR_PREFIX: &str = "Query ERROR";

/// Parses a newline-delimited, tab-separated response one line at a time.
///
/// Blank lines are skipped. A body that opens with BioMart's `Query ERROR`
/// banner, or any line with the wrong number of fields, is a protocol error.
#[derive(Debug)]
pub struct TsvRowParser {
    arity: usize,
    rows_seen: usize,
}

impl TsvRowParser {
    pub fn new(arity: usize) -> Self {
        Self { arity, rows_seen: 0 }
    }

    pub fn parse_line(&mut self, line: &str) -> Result<Option<Row>, SourceError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        if self.rows_seen == 0 && line.starts_with(QUERY_ERROR_PREFIX) {
            return Err(SourceError::Protocol(line.trim().to_string()));
        }

        let row = Row::from_tsv_line(line, self.arity)
            .map_err(|e| SourceError::Protocol(e.to_string()))?;
        self.rows_seen += 1;

        Ok(Some(row))
    }

    /// Parse a whole response body held in memory
    pub fn parse_body(arity: usize, body: &str) -> Result<Vec<Row>, SourceError> {
        let mut parser = Self::new(arity);
        let mut rows = Vec::new();

        for line in body.lines() {
            if let Some(row) = parser.parse_line(line)? {
                rows.push(row);
            }
        }

        Ok(rows)
    }
}
