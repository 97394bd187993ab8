//! Import and export service implementations.
//!
//! Orchestrates decoding, validation, the uniqueness gate, and storage.

pub mod export;
pub mod import;

pub use export::{DateRange, ExportFilters, ExportService};
pub use import::{ImportOptions, ImportProgress, ImportService, ProgressCallback};
