//! # Storeport
//!
//! Bulk catalog import/export engine for multi-tenant storefronts.
//!
//! Storeport ingests tabular or structured catalog data (products, customers),
//! validates it against business rules, rejects intra-batch natural-key
//! conflicts, and writes it to a persistence backend in bounded batches with
//! retry and progress reporting. The same validation runs in a side-effect-free
//! preview mode, so a preview verdict and a real import never disagree.
//!
//! ## Features
//!
//! - Delimited-text and JSON codecs with a lossless round-trip law
//! - Declarative per-entity schemas producing typed, normalized rows
//! - All-or-nothing duplicate-key gate ahead of any write
//! - Batch-parallel writes with per-row retry and error classification
//! - Store-scoped export to text or JSON
//!
//! ## Example
//!
//! ```rust,ignore
//! use storeport::{EngineConfig, EntityType, ImportService, InMemoryBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let service = ImportService::new(backend, EngineConfig::default());
//! let result = service
//!     .import_from_text("store-1", EntityType::Products, csv_text, ImportOptions::default())
//!     .await?;
//! println!("imported {} / failed {}", result.imported, result.failed);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod storage;

// Re-exports for convenience
pub use config::{EngineConfig, RetryConfig, UnknownCategoryPolicy};
pub use io::{
    ExportFilters, ExportService, ImportOptions, ImportProgress, ImportService, PreviewEngine,
};
pub use models::{
    EntityType, ImportError, ImportResult, NormalizedRow, PreviewResult, Row, RowVerdict,
};
pub use storage::{BackendError, CatalogBackend, InMemoryBackend, SqliteBackend};

/// Error type for storeport operations.
///
/// Row-level problems (validation failures, backend constraint violations,
/// exhausted retries) are never raised through this type; they are reported
/// as [`ImportError`] entries inside an [`ImportResult`].
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing store identifier, malformed JSON records, unsupported filters |
/// | `LimitExceeded` | Input larger than the byte ceiling or with too many rows |
/// | `Format` | Delimited text that cannot be tokenized |
/// | `Backend` | A read against the persistence backend fails during export |
/// | `OperationFailed` | File I/O errors, runtime task failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The store identifier is empty
    /// - JSON input is not an array of objects
    /// - Export filters are not supported for the entity type
    /// - An unknown entity type or format name is parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An input ceiling was exceeded before any row was processed.
    #[error("{limit} limit exceeded: {actual} > {max}")]
    LimitExceeded {
        /// Which ceiling was hit (`input size` or `row count`).
        limit: &'static str,
        /// The observed value.
        actual: usize,
        /// The configured maximum.
        max: usize,
    },

    /// Delimited text could not be decoded.
    #[error("format error: {0}")]
    Format(String),

    /// The persistence backend failed a read.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - A row task could not be joined
    /// - Configuration files cannot be parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for storeport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::LimitExceeded {
            limit: "row count",
            actual: 1001,
            max: 1000,
        };
        assert_eq!(err.to_string(), "row count limit exceeded: 1001 > 1000");
    }

    #[test]
    fn test_backend_error_converts() {
        let err: Error = BackendError::new(Some("08006"), "connection reset").into();
        assert!(err.to_string().contains("connection reset"));
    }
}
