//! Catalog import service.
//!
//! Orchestrates one import call through four phases: limits are checked
//! (`Validating`), natural keys are checked across the whole input
//! (`Gating`), rows are written in bounded concurrent batches
//! (`Batching`), and the outcome is summarized (`Completed`).

#![allow(clippy::cast_precision_loss)]

use crate::config::EngineConfig;
use crate::io::codec;
use crate::io::formats::{Format, json};
use crate::io::preview::PreviewEngine;
use crate::io::task_group::BoundedTaskGroup;
use crate::io::uniqueness::{check_uniqueness, duplicate_message};
use crate::io::validation::validate;
use crate::io::writer::{RowWriter, WriteFailure};
use crate::models::{EntityType, ImportError, ImportResult, PreviewResult, Row};
use crate::storage::CatalogBackend;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Progress callback for import operations.
pub type ProgressCallback = Box<dyn Fn(&ImportProgress) + Send + Sync>;

/// Progress reported after each batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportProgress {
    /// Rows written so far.
    pub imported: usize,
    /// Rows settled so far, written or failed.
    pub processed: usize,
    /// Rows in the import.
    pub total: usize,
    /// Batches completed.
    pub batch: usize,
    /// Batches in the import.
    pub batches: usize,
}

impl ImportProgress {
    /// Returns the percentage of rows settled (0-100).
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Options for one import call.
#[derive(Default)]
pub struct ImportOptions {
    /// Called after each batch settles.
    pub on_progress: Option<ProgressCallback>,
}

impl ImportOptions {
    /// Creates options with no callback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ImportProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    fn report(&self, progress: &ImportProgress) {
        if let Some(cb) = &self.on_progress {
            cb(progress);
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Importer state machine phases, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Validating,
    Gating,
    Batching,
    Completed,
}

/// Outcome slot for one row of a batch, in input order.
enum Slot {
    Rejected(ImportError),
    Spawned(usize),
}

/// Service for importing catalog rows into a backend.
#[derive(Clone)]
pub struct ImportService {
    config: EngineConfig,
    writer: RowWriter,
    preview: PreviewEngine,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogBackend>, config: EngineConfig) -> Self {
        let config = config.clamped();
        let writer = RowWriter::new(
            Arc::clone(&backend),
            config.retry,
            config.unknown_category_policy,
        );
        let preview = PreviewEngine::new(backend, config.unknown_category_policy);
        Self {
            config,
            writer,
            preview,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Imports delimited text.
    ///
    /// Row numbers in errors count the header line.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing store identifier, an input over the
    /// size or row ceiling, or text that cannot be decoded. Row-level
    /// failures are reported in the [`ImportResult`].
    pub async fn import_from_text(
        &self,
        store_id: &str,
        entity: EntityType,
        text: &str,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        self.import_encoded(store_id, entity, text, Format::Csv, options)
            .await
    }

    /// Imports a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Same as [`ImportService::import_from_text`], with malformed JSON
    /// reported as [`Error::InvalidInput`].
    pub async fn import_from_json(
        &self,
        store_id: &str,
        entity: EntityType,
        text: &str,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        self.import_encoded(store_id, entity, text, Format::Json, options)
            .await
    }

    /// Imports already-decoded records; row numbers are 1-indexed.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing store identifier or too many rows.
    pub async fn import_from_records(
        &self,
        store_id: &str,
        entity: EntityType,
        records: Vec<Row>,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        require_store(store_id)?;
        self.run(store_id, entity, records, Format::Json.row_offset(), &options)
            .await
    }

    /// Imports a file.
    ///
    /// `format` overrides detection from the file extension. The size
    /// ceiling is checked before the file is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, in addition to the
    /// errors of [`ImportService::import_from_text`].
    pub async fn import_from_file(
        &self,
        store_id: &str,
        entity: EntityType,
        path: &Path,
        format: Option<Format>,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        require_store(store_id)?;
        let format = resolve_format(format, path)?;
        let text = self.read_bounded(path).await?;
        self.import_encoded(store_id, entity, &text, format, options)
            .await
    }

    /// Previews a file without writing.
    ///
    /// Format detection and the size check match
    /// [`ImportService::import_from_file`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, in addition to the
    /// errors of [`ImportService::preview_text`].
    pub async fn preview_file(
        &self,
        store_id: &str,
        entity: EntityType,
        path: &Path,
        format: Option<Format>,
    ) -> Result<PreviewResult> {
        require_store(store_id)?;
        let format = resolve_format(format, path)?;
        let text = self.read_bounded(path).await?;
        self.preview_text(store_id, entity, &text, format)
    }

    /// Previews decoded records without writing; row numbers are 1-indexed.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing store identifier or too many rows.
    pub fn preview(
        &self,
        store_id: &str,
        entity: EntityType,
        records: &[Row],
    ) -> Result<PreviewResult> {
        require_store(store_id)?;
        self.check_row_limit(records.len())?;
        Ok(self
            .preview
            .preview(store_id, entity, records, Format::Json.row_offset()))
    }

    /// Previews encoded text without writing.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing store identifier, an input over the
    /// ceilings, or undecodable text.
    pub fn preview_text(
        &self,
        store_id: &str,
        entity: EntityType,
        text: &str,
        format: Format,
    ) -> Result<PreviewResult> {
        require_store(store_id)?;
        let rows = self.decode_bounded(text, format)?;
        self.check_row_limit(rows.len())?;
        Ok(self
            .preview
            .preview(store_id, entity, &rows, format.row_offset()))
    }

    async fn import_encoded(
        &self,
        store_id: &str,
        entity: EntityType,
        text: &str,
        format: Format,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        require_store(store_id)?;
        let rows = self.decode_bounded(text, format)?;
        self.run(store_id, entity, rows, format.row_offset(), &options)
            .await
    }

    #[instrument(
        skip(self, entity, rows, options),
        fields(entity = %entity, rows = rows.len(), batch_size = self.config.batch_size)
    )]
    async fn run(
        &self,
        store_id: &str,
        entity: EntityType,
        rows: Vec<Row>,
        row_offset: usize,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let started = Instant::now();
        let label = entity.as_str();

        tracing::debug!(phase = ?Phase::Validating, "import phase");
        self.check_row_limit(rows.len())?;

        tracing::debug!(phase = ?Phase::Gating, "import phase");
        let duplicates = gate(entity, &rows, row_offset);
        if !duplicates.is_empty() {
            tracing::warn!(
                entity = label,
                duplicates = duplicates.len(),
                "duplicate natural keys, import rejected"
            );
            metrics::counter!("import_gate_rejections_total", "entity" => label).increment(1);
            return Ok(ImportResult::rejected(duplicates));
        }

        tracing::debug!(phase = ?Phase::Batching, "import phase");
        let total = rows.len();
        let batch_size = self.config.batch_size;
        let batches = total.div_ceil(batch_size);
        let mut progress = ImportProgress {
            total,
            batches,
            ..ImportProgress::default()
        };
        let mut errors = Vec::new();

        for (batch_index, batch) in rows.chunks(batch_size).enumerate() {
            if batch_index > 0 && self.config.inter_batch_pause_ms > 0 {
                tokio::time::sleep(self.config.inter_batch_pause()).await;
            }

            let first_index = batch_index * batch_size;
            let (imported, batch_errors) = self
                .run_batch(store_id, entity, batch, first_index, row_offset)
                .await?;

            metrics::counter!("import_rows_total", "entity" => label, "status" => "imported")
                .increment(imported as u64);
            metrics::counter!("import_rows_total", "entity" => label, "status" => "failed")
                .increment(batch_errors.len() as u64);

            progress.imported += imported;
            progress.processed += batch.len();
            progress.batch = batch_index + 1;
            errors.extend(batch_errors);

            tracing::debug!(
                batch = progress.batch,
                batches,
                imported = progress.imported,
                processed = progress.processed,
                "batch complete"
            );
            options.report(&progress);
        }

        let result = ImportResult::new(progress.imported, errors);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("import_duration_ms", "entity" => label).record(elapsed_ms);
        tracing::debug!(phase = ?Phase::Completed, "import phase");
        tracing::info!(
            entity = label,
            imported = result.imported,
            failed = result.failed,
            elapsed_ms,
            "import complete"
        );
        Ok(result)
    }

    /// Validates and writes one batch; returns the imported count and the
    /// errors in input order.
    async fn run_batch(
        &self,
        store_id: &str,
        entity: EntityType,
        batch: &[Row],
        first_index: usize,
        row_offset: usize,
    ) -> Result<(usize, Vec<ImportError>)> {
        let mut group = BoundedTaskGroup::new(self.config.batch_size);
        let mut slots = Vec::with_capacity(batch.len());

        for (i, row) in batch.iter().enumerate() {
            let row_number = first_index + i + row_offset;
            let validation = validate(row, entity);
            let Some(normalized) = validation.normalized else {
                let first = validation.errors.into_iter().next();
                let error = first.map_or_else(
                    || ImportError::new(row_number, None, "validation failed"),
                    |e| ImportError::new(row_number, e.field.as_deref(), e.message),
                );
                slots.push(Slot::Rejected(error));
                continue;
            };

            let writer = self.writer.clone();
            let store = store_id.to_string();
            group
                .spawn_blocking(move || writer.write_row(&store, &normalized))
                .await?;
            slots.push(Slot::Spawned(row_number));
        }

        let mut outcomes = group.join_all().await.into_iter();
        let mut imported = 0;
        let mut errors = Vec::new();
        for slot in slots {
            match slot {
                Slot::Rejected(error) => errors.push(error),
                Slot::Spawned(row_number) => match outcomes.next() {
                    Some(Ok(Ok(()))) => imported += 1,
                    Some(Ok(Err(WriteFailure { field, message, .. }))) => {
                        errors.push(ImportError::new(row_number, field.as_deref(), message));
                    },
                    Some(Err(join_error)) => {
                        tracing::warn!(row = row_number, error = %join_error, "row task failed");
                        errors.push(ImportError::new(
                            row_number,
                            None,
                            format!("row task failed: {join_error}"),
                        ));
                    },
                    None => errors.push(ImportError::new(row_number, None, "row task lost")),
                },
            }
        }
        Ok((imported, errors))
    }

    fn decode_bounded(&self, text: &str, format: Format) -> Result<Vec<Row>> {
        self.check_size_limit(text.len())?;
        match format {
            Format::Csv => codec::decode(text),
            Format::Json => json::decode(text),
        }
    }

    async fn read_bounded(&self, path: &Path) -> Result<String> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "stat_import_file".to_string(),
                cause: e.to_string(),
            })?;
        self.check_size_limit(usize::try_from(metadata.len()).unwrap_or(usize::MAX))?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "read_import_file".to_string(),
                cause: e.to_string(),
            })
    }

    fn check_size_limit(&self, bytes: usize) -> Result<()> {
        if bytes > self.config.max_input_bytes {
            tracing::warn!(bytes, max = self.config.max_input_bytes, "input too large");
            return Err(Error::LimitExceeded {
                limit: "input size",
                actual: bytes,
                max: self.config.max_input_bytes,
            });
        }
        Ok(())
    }

    fn check_row_limit(&self, rows: usize) -> Result<()> {
        if rows > self.config.max_rows {
            tracing::warn!(rows, max = self.config.max_rows, "too many rows");
            return Err(Error::LimitExceeded {
                limit: "row count",
                actual: rows,
                max: self.config.max_rows,
            });
        }
        Ok(())
    }
}

fn resolve_format(format: Option<Format>, path: &Path) -> Result<Format> {
    format.map_or_else(|| Format::from_path(path), Ok)
}

fn require_store(store_id: &str) -> Result<()> {
    if store_id.trim().is_empty() {
        return Err(Error::InvalidInput("store identifier is required".to_string()));
    }
    Ok(())
}

/// Checks every natural key across all rows; one error per offending row.
fn gate(entity: EntityType, rows: &[Row], row_offset: usize) -> Vec<ImportError> {
    let mut by_row: BTreeMap<usize, ImportError> = BTreeMap::new();
    for &key_name in entity.natural_keys() {
        let report = check_uniqueness(rows, |row: &Row| row.lookup(key_name));
        for dup in report.duplicates {
            let shown = rows
                .get(dup.row)
                .and_then(|row| row.lookup(key_name))
                .map_or(dup.key.as_str(), str::trim);
            by_row.entry(dup.row).or_insert_with(|| {
                ImportError::new(
                    dup.row + row_offset,
                    Some(key_name),
                    duplicate_message(key_name, shown, dup.first_occurrence_row + row_offset),
                )
            });
        }
    }
    by_row.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;
    use std::sync::Mutex;

    fn service(backend: &Arc<InMemoryBackend>) -> ImportService {
        ImportService::new(
            Arc::clone(backend) as Arc<dyn CatalogBackend>,
            EngineConfig::default().without_delays(),
        )
    }

    fn product(name: &str, slug: &str, price: &str) -> Row {
        Row::new()
            .with("name", name)
            .with("slug", slug)
            .with("price", price)
    }

    #[tokio::test]
    async fn test_duplicate_slug_gate() {
        let backend = Arc::new(InMemoryBackend::new());
        let rows = vec![
            product("Widget A", "widget-a", "10"),
            product("Widget B", "widget-a", "20"),
        ];
        let result = service(&backend)
            .import_from_records("s1", EntityType::Products, rows, ImportOptions::new())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.imported, 0);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].row, 2);
        assert_eq!(result.errors[0].field.as_deref(), Some("slug"));
        assert_eq!(
            result.errors[0].error,
            "duplicate slug 'widget-a' also on row 1"
        );
        assert_eq!(backend.insert_calls("products"), 0);
    }

    #[tokio::test]
    async fn test_gate_reports_each_row_once() {
        let backend = Arc::new(InMemoryBackend::new());
        let rows = vec![
            product("Widget A", "a", "1").with("sku", "S"),
            product("Widget B", "a", "1").with("sku", "s"),
        ];
        let result = service(&backend)
            .import_from_records("s1", EntityType::Products, rows, ImportOptions::new())
            .await
            .unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].field.as_deref(), Some("slug"));
    }

    #[tokio::test]
    async fn test_text_rows_count_header() {
        let backend = Arc::new(InMemoryBackend::new());
        let text = "name,slug,price\nWidget,widget,10\nGadget,bad slug,5\n";
        let result = service(&backend)
            .import_from_text("s1", EntityType::Products, text, ImportOptions::new())
            .await
            .unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.errors, vec![ImportError::new(
            3,
            Some("slug"),
            "invalid format"
        )]);
    }

    #[tokio::test]
    async fn test_progress_after_each_batch() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = ImportService::new(
            Arc::clone(&backend) as Arc<dyn CatalogBackend>,
            EngineConfig::default().without_delays().with_batch_size(2),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let rows: Vec<Row> = (0..5)
            .map(|i| product("Widget", &format!("w-{i}"), "1"))
            .collect();

        let result = service
            .import_from_records(
                "s1",
                EntityType::Products,
                rows,
                ImportOptions::new().with_progress(move |p| sink.lock().unwrap().push(*p)),
            )
            .await
            .unwrap();

        assert_eq!(result.imported, 5);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].processed, 2);
        assert_eq!(seen[2].processed, 5);
        assert_eq!(seen[2].batch, 3);
        assert!((seen[2].percent_complete() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_store_is_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let err = service(&backend)
            .import_from_records(" ", EntityType::Products, Vec::new(), ImportOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_limits_are_terminal() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = ImportService::new(
            Arc::clone(&backend) as Arc<dyn CatalogBackend>,
            EngineConfig::default()
                .without_delays()
                .with_max_rows(1)
                .with_max_input_bytes(64),
        );

        let rows = vec![product("Widget", "a", "1"), product("Widget", "b", "1")];
        let err = service
            .import_from_records("s1", EntityType::Products, rows, ImportOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { limit: "row count", actual: 2, max: 1 }));

        let text = format!("name,slug,price\n{}", "Widget,a,1\n".repeat(10));
        let err = service
            .import_from_text("s1", EntityType::Products, &text, ImportOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { limit: "input size", .. }));
        assert_eq!(backend.insert_calls("products"), 0);
    }

    #[tokio::test]
    async fn test_empty_input_succeeds() {
        let backend = Arc::new(InMemoryBackend::new());
        let result = service(&backend)
            .import_from_text("s1", EntityType::Customers, "", ImportOptions::new())
            .await
            .unwrap();
        assert_eq!(result, ImportResult::new(0, Vec::new()));
    }

    #[test]
    fn test_progress_percent_empty() {
        assert!((ImportProgress::default().percent_complete() - 100.0).abs() < f64::EPSILON);
    }
}
