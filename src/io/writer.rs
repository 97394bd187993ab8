//! Row writer: one normalized row to one backend insert.

use crate::config::{RetryConfig, UnknownCategoryPolicy};
use crate::io::category::{self, CategoryResolution, unknown_category_message};
use crate::io::retry::{RetryError, RetryPolicy, describe};
use crate::models::NormalizedRow;
use crate::storage::{CatalogBackend, Filter};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Why a row was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Field at fault, when known.
    pub field: Option<String>,
    /// Human-readable reason.
    pub message: String,
    /// Backend attempts made before giving up.
    pub attempts: u32,
}

impl WriteFailure {
    fn rejected(field: &str, message: String) -> Self {
        Self {
            field: Some(field.to_string()),
            message,
            attempts: 0,
        }
    }

    fn from_retry(err: &RetryError) -> Self {
        Self {
            field: None,
            message: describe(&err.error),
            attempts: err.last_attempt.attempt,
        }
    }
}

/// Writes validated rows with write-time checks and retry.
#[derive(Clone)]
pub struct RowWriter {
    backend: Arc<dyn CatalogBackend>,
    retry: RetryPolicy,
    category_policy: UnknownCategoryPolicy,
}

impl RowWriter {
    /// Creates a writer over `backend`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        retry: RetryConfig,
        category_policy: UnknownCategoryPolicy,
    ) -> Self {
        Self {
            backend,
            retry: RetryPolicy::new(retry),
            category_policy,
        }
    }

    /// Writes one row for `store_id`.
    ///
    /// Products with a SKU are first checked against rows already persisted
    /// for the store. Category names are resolved softly: an unresolved name
    /// is stored as text unless the policy rejects unknown categories.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteFailure`] describing why the row was not written.
    #[instrument(skip(self, row), fields(entity = %row.entity()))]
    pub fn write_row(&self, store_id: &str, row: &NormalizedRow) -> Result<(), WriteFailure> {
        let entity = row.entity();
        let table = entity.table();
        let label = entity.as_str();

        if let Some(sku) = row.natural_key("sku") {
            let filters = [
                Filter::eq("store_id", store_id),
                Filter::eq_ignore_case("sku", sku),
            ];
            let taken = self
                .retry
                .run(label, || self.backend.exists(table, &filters))
                .map_err(|e| WriteFailure::from_retry(&e))?;
            if taken {
                return Err(WriteFailure::rejected(
                    "sku",
                    format!("SKU '{sku}' already exists"),
                ));
            }
        }

        let mut record = row.to_record(store_id);

        if let Some(name) = row.category() {
            let resolution = category::lookup(self.backend.as_ref(), store_id, name);
            if !resolution.is_accepted(self.category_policy) {
                return Err(WriteFailure::rejected(
                    "category",
                    unknown_category_message(name),
                ));
            }
            if let CategoryResolution::Found(id) = resolution {
                record.insert("category_id".into(), Value::from(id));
            }
        }

        record.insert("created_at".into(), Value::from(Utc::now().to_rfc3339()));

        self.retry
            .run(label, || self.backend.insert(table, &record))
            .map_err(|e| WriteFailure::from_retry(&e))
    }
}
