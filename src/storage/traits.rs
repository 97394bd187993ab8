//! Persistence contract consumed by the import/export engine.

use serde_json::{Map, Value};
use std::fmt;

/// A persisted record: column name to JSON value.
pub type Record = Map<String, Value>;

/// Error returned by a persistence backend call.
///
/// The optional `code` is the backend's machine-readable error code
/// (SQLSTATE-style, e.g. `23505` for a unique violation). Retry decisions
/// are made from this code alone; the message is only for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// Machine-readable error code, if the backend supplied one.
    pub code: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl BackendError {
    /// Creates a backend error with an optional code.
    #[must_use]
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(String::from),
            message: message.into(),
        }
    }

    /// Creates a backend error carrying a code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Comparison operator for a select filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Column equals value.
    Eq,
    /// Column equals value, ignoring ASCII case (string columns only).
    EqIgnoreCase,
    /// Column is greater than or equal to value.
    Gte,
    /// Column is less than or equal to value.
    Lte,
}

/// A single column predicate; filters in a slice are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: Value,
}

impl Filter {
    /// `column = value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// Case-insensitive `column = value`.
    #[must_use]
    pub fn eq_ignore_case(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::EqIgnoreCase,
            value: value.into(),
        }
    }

    /// `column >= value`.
    #[must_use]
    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    /// `column <= value`.
    #[must_use]
    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }

    /// Evaluates the predicate against a record held in memory.
    ///
    /// Strings compare lexically (ISO-8601 timestamps sort correctly);
    /// numbers compare numerically. A missing column never matches.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.column) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::EqIgnoreCase => match (actual.as_str(), self.value.as_str()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => actual == &self.value,
            },
            FilterOp::Gte => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_ge),
            FilterOp::Lte => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_le),
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}

/// Trait for catalog persistence backends.
///
/// The engine relies on nothing beyond this narrow insert/select contract:
/// no transactions across rows, no locking. Each call is synchronous from the
/// caller's point of view and independently fallible.
pub trait CatalogBackend: Send + Sync {
    /// Inserts one record into `table`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] carrying the backend's error code when the
    /// insert is rejected (constraint violation) or cannot be performed.
    fn insert(&self, table: &str, record: &Record) -> Result<(), BackendError>;

    /// Selects all records from `table` matching every filter.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the read cannot be performed.
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, BackendError>;

    /// Returns whether any record matches the filters.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the read cannot be performed.
    fn exists(&self, table: &str, filters: &[Filter]) -> Result<bool, BackendError> {
        Ok(!self.select(table, filters)?.is_empty())
    }
}
