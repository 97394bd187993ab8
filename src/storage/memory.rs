//! In-memory catalog backend.
//!
//! Emulates the unique constraints of the production schema and supports
//! fault injection, so the importer's retry and classification paths can be
//! exercised without a database.

use super::traits::{BackendError, CatalogBackend, Filter, Record};
use super::{UNIQUE_VIOLATION, acquire_lock, unique_keys};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Vec<Record>>,
    insert_faults: HashMap<String, VecDeque<BackendError>>,
    select_faults: HashMap<String, BackendError>,
    insert_calls: HashMap<String, usize>,
    next_id: u64,
}

/// Catalog backend holding every table in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing constraints and fault injection.
    pub fn seed(&self, table: &str, record: Record) {
        let mut state = acquire_lock(&self.state);
        state.tables.entry(table.to_string()).or_default().push(record);
    }

    /// Queues an error to be returned by the next insert into `table`.
    ///
    /// Queued errors are consumed in order, one per insert call.
    pub fn fail_next_insert(&self, table: &str, error: BackendError) {
        let mut state = acquire_lock(&self.state);
        state
            .insert_faults
            .entry(table.to_string())
            .or_default()
            .push_back(error);
    }

    /// Makes every select against `table` fail with `error`.
    pub fn fail_selects(&self, table: &str, error: BackendError) {
        let mut state = acquire_lock(&self.state);
        state.select_faults.insert(table.to_string(), error);
    }

    /// Returns a snapshot of the records in `table`.
    #[must_use]
    pub fn records(&self, table: &str) -> Vec<Record> {
        let state = acquire_lock(&self.state);
        state.tables.get(table).cloned().unwrap_or_default()
    }

    /// Returns how many insert calls `table` has received, failed ones included.
    #[must_use]
    pub fn insert_calls(&self, table: &str) -> usize {
        let state = acquire_lock(&self.state);
        state.insert_calls.get(table).copied().unwrap_or(0)
    }
}

impl CatalogBackend for InMemoryBackend {
    fn insert(&self, table: &str, record: &Record) -> Result<(), BackendError> {
        let mut state = acquire_lock(&self.state);
        *state.insert_calls.entry(table.to_string()).or_default() += 1;

        if let Some(err) = state
            .insert_faults
            .get_mut(table)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        let existing = state.tables.get(table).map_or(&[][..], Vec::as_slice);
        for columns in unique_keys(table) {
            let Some(key) = composite_key(record, columns) else {
                continue;
            };
            if existing
                .iter()
                .any(|other| composite_key(other, columns).as_ref() == Some(&key))
            {
                return Err(BackendError::with_code(
                    UNIQUE_VIOLATION,
                    format!(
                        "duplicate key value violates unique constraint on {table}({})",
                        columns.join(", ")
                    ),
                ));
            }
        }

        state.next_id += 1;
        let mut stored = record.clone();
        stored
            .entry("id".to_string())
            .or_insert_with(|| Value::from(state.next_id));
        state.tables.entry(table.to_string()).or_default().push(stored);
        Ok(())
    }

    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, BackendError> {
        let state = acquire_lock(&self.state);
        if let Some(err) = state.select_faults.get(table) {
            return Err(err.clone());
        }
        Ok(state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Builds the composite key for a unique constraint; `None` when any column
/// is null or absent (nulls never collide).
fn composite_key(record: &Record, columns: &[&str]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|c| match record.get(*c) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.to_lowercase()),
            Some(other) => Some(other.to_string()),
        })
        .collect()
}
