//! Catalog export service.
//!
//! Reads store-scoped records from the backend and serializes them. Export
//! has no partial-success concept: any backend failure is returned as a
//! single error.

use crate::io::codec;
use crate::io::formats::{Format, json};
use crate::models::{EntityType, Row};
use crate::storage::{CatalogBackend, Filter, Record};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest creation time, inclusive.
    pub from: Option<DateTime<Utc>>,
    /// Latest creation time, inclusive.
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates a range bounded on both ends.
    #[must_use]
    pub const fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::with_capacity(2);
        if let Some(from) = self.from {
            filters.push(Filter::gte("created_at", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            filters.push(Filter::lte("created_at", to.to_rfc3339()));
        }
        filters
    }
}

/// Filters accepted by an export.
///
/// The set is closed per entity type: a date range applies to orders only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportFilters {
    /// Creation-time window (orders only).
    pub date_range: Option<DateRange>,
}

impl ExportFilters {
    /// No filtering beyond the store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the creation-time window.
    #[must_use]
    pub const fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    fn to_backend_filters(self, store_id: &str, entity: EntityType) -> Result<Vec<Filter>> {
        let mut filters = vec![Filter::eq("store_id", store_id)];
        if let Some(range) = self.date_range {
            if entity != EntityType::Orders {
                return Err(Error::InvalidInput(format!(
                    "date range filter is not supported for {entity}"
                )));
            }
            filters.extend(range.filters());
        }
        Ok(filters)
    }
}

/// Service for exporting catalog records.
#[derive(Clone)]
pub struct ExportService {
    backend: Arc<dyn CatalogBackend>,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self { backend }
    }

    /// Reads the records of `entity` for `store_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a missing store or an unsupported
    /// filter, and [`Error::Backend`] if the read fails.
    #[instrument(skip(self, entity, filters), fields(entity = %entity))]
    pub fn export_records(
        &self,
        store_id: &str,
        entity: EntityType,
        filters: &ExportFilters,
    ) -> Result<Vec<Record>> {
        if store_id.trim().is_empty() {
            return Err(Error::InvalidInput("store identifier is required".to_string()));
        }
        let backend_filters = filters.to_backend_filters(store_id, entity)?;
        let records = self.backend.select(entity.table(), &backend_filters)?;

        metrics::counter!("export_rows_total", "entity" => entity.as_str())
            .increment(records.len() as u64);
        tracing::info!(entity = entity.as_str(), rows = records.len(), "export complete");
        Ok(records)
    }

    /// Exports as delimited text.
    ///
    /// # Errors
    ///
    /// Same as [`ExportService::export_records`], plus encoding failures.
    pub fn export_to_text(
        &self,
        store_id: &str,
        entity: EntityType,
        filters: &ExportFilters,
    ) -> Result<String> {
        let records = self.export_records(store_id, entity, filters)?;
        let rows: Vec<Row> = records.iter().map(Row::from_json_object).collect();
        codec::encode(&rows)
    }

    /// Exports as a JSON array.
    ///
    /// # Errors
    ///
    /// Same as [`ExportService::export_records`], plus encoding failures.
    pub fn export_to_json(
        &self,
        store_id: &str,
        entity: EntityType,
        filters: &ExportFilters,
    ) -> Result<String> {
        let records = self.export_records(store_id, entity, filters)?;
        json::encode(&records)
    }

    /// Exports in the given format.
    ///
    /// # Errors
    ///
    /// Same as [`ExportService::export_records`], plus encoding failures.
    pub fn export(
        &self,
        store_id: &str,
        entity: EntityType,
        filters: &ExportFilters,
        format: Format,
    ) -> Result<String> {
        match format {
            Format::Csv => self.export_to_text(store_id, entity, filters),
            Format::Json => self.export_to_json(store_id, entity, filters),
        }
    }
}
