//! Common types used across martsync

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const SQL_IDENT_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static SQL_IDENT_REGEX: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(SQL_IDENT_PATTERN));

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One record of an annotation table.
///
/// Field 0 is always the identifier the query was filtered on; the remaining
/// fields are the requested attributes in request order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Vec<String>);

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Parse one tab-separated line, enforcing a fixed arity.
    ///
    /// A trailing carriage return is stripped so CRLF responses parse the
    /// same as LF ones.
    pub fn from_tsv_line(line: &str, arity: usize) -> Result<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();

        if fields.len() != arity {
            return Err(Error::ArityMismatch {
                expected: arity,
                actual: fields.len(),
                line: line.to_string(),
            });
        }

        Ok(Self(fields))
    }

    pub fn identifier(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// True when any of the given column positions is empty or missing.
    pub fn has_empty(&self, columns: &[usize]) -> bool {
        columns
            .iter()
            .any(|&col| self.0.get(col).map_or(true, |value| value.is_empty()))
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// SQL identifiers and table layouts
// ============================================================================

/// A table or column name that is safe to interpolate into SQL.
///
/// SQLite cannot bind identifiers as parameters, so every name that reaches
/// a statement goes through this type first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SqlIdent(String);

impl SqlIdent {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let pattern = SQL_IDENT_REGEX.as_ref().map_err(|e| Error::from(e.clone()))?;

        if !pattern.is_match(&name) {
            return Err(Error::InvalidIdentifier(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SqlIdent {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SqlIdent> for String {
    fn from(value: SqlIdent) -> Self {
        value.0
    }
}

impl std::fmt::Display for SqlIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Layout of a destination table: its name, ordered columns, and the column
/// positions that must be non-empty for a row to be stored.
///
/// Column 0 holds the identifier and is always required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    name: SqlIdent,
    columns: Vec<SqlIdent>,
    required: Vec<usize>,
}

impl TableSpec {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = SqlIdent::new(name)?;
        let columns = columns
            .into_iter()
            .map(SqlIdent::new)
            .collect::<Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Err(Error::InvalidTable(format!("table '{}' has no columns", name)));
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(Error::InvalidTable(format!(
                    "table '{}' repeats column '{}'",
                    name, column
                )));
            }
        }

        Ok(Self {
            name,
            columns,
            required: vec![0],
        })
    }

    /// Also require the column at `position` to be non-empty.
    pub fn require_column(mut self, position: usize) -> Result<Self> {
        if position >= self.columns.len() {
            return Err(Error::InvalidTable(format!(
                "required column {} out of range for table '{}' with {} columns",
                position,
                self.name,
                self.columns.len()
            )));
        }

        if !self.required.contains(&position) {
            self.required.push(position);
            self.required.sort_unstable();
        }

        Ok(self)
    }

    pub fn name(&self) -> &SqlIdent {
        &self.name
    }

    pub fn columns(&self) -> &[SqlIdent] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn required_columns(&self) -> &[usize] {
        &self.required
    }

    /// Whether a row carries values in every required column.
    pub fn accepts(&self, row: &Row) -> bool {
        !row.has_empty(&self.required)
    }
}
