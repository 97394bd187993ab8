//! Import/Export I/O subsystem.
//!
//! Bulk catalog import and store-scoped export.
//!
//! # Architecture
//!
//! - **Codecs** ([`codec`], [`formats::json`]) turn text into [`Row`]s and back
//! - **Validation layer** normalizes raw rows into typed records
//! - **Uniqueness gate** rejects an import whose natural keys repeat
//! - **Services** orchestrate batching, retry, and progress reporting
//!
//! # Supported Formats
//!
//! | Format | Import | Export | Notes |
//! |--------|--------|--------|-------|
//! | CSV | ✓ | ✓ | Header line, every field quoted on export |
//! | JSON | ✓ | ✓ | Array of objects |
//!
//! # Examples
//!
//! ```rust,ignore
//! use storeport::io::{ImportOptions, ImportService};
//! use storeport::{EngineConfig, EntityType, SqliteBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(SqliteBackend::new("catalog.db")?);
//! let service = ImportService::new(backend, EngineConfig::load_default());
//! let result = service
//!     .import_from_text("store-1", EntityType::Products, &text, ImportOptions::new())
//!     .await?;
//! println!("Imported {} rows, {} failed", result.imported, result.failed);
//! ```
//!
//! [`Row`]: crate::models::Row

pub mod category;
pub mod codec;
pub mod formats;
pub mod preview;
pub mod retry;
pub mod sanitize;
pub mod services;
pub mod task_group;
pub mod uniqueness;
pub mod validation;
pub mod writer;

// Re-exports for convenience
pub use codec::errors_to_text;
pub use formats::Format;
pub use preview::PreviewEngine;
pub use services::export::{DateRange, ExportFilters, ExportService};
pub use services::import::{ImportOptions, ImportProgress, ImportService, ProgressCallback};
pub use validation::{ValidationResult, validate};
