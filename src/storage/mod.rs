//! Storage layer abstraction.
//!
//! The engine reaches persistence only through the [`CatalogBackend`]
//! insert/select contract. Two implementations ship with the crate:
//! - **`SqliteBackend`**: file or in-memory `SQLite`, used by the CLI
//! - **`InMemoryBackend`**: constraint-emulating store with fault injection

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{BackendError, CatalogBackend, Filter, FilterOp, Record};

use std::sync::{Mutex, MutexGuard};

/// Backend code for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Backend code for a foreign-key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Unique constraints per table, each a set of columns scoped by store.
#[must_use]
pub fn unique_keys(table: &str) -> &'static [&'static [&'static str]] {
    match table {
        "products" => &[&["store_id", "slug"], &["store_id", "sku"]],
        "customers" => &[&["store_id", "email"]],
        _ => &[],
    }
}

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning.
pub(crate) fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("storage mutex was poisoned, recovering");
            metrics::counter!("storage_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}
