//! Best-effort category lookup.
//!
//! Resolution never fails a row on its own: lookup errors are reported to
//! the caller as [`CategoryResolution::LookupFailed`] and unknown names are
//! judged by the configured [`UnknownCategoryPolicy`].

pub use crate::config::UnknownCategoryPolicy;

use crate::storage::{CatalogBackend, Filter};
use serde_json::Value;
use std::collections::HashMap;

/// Backend table holding categories.
pub const CATEGORIES_TABLE: &str = "categories";

/// Outcome of looking up one category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryResolution {
    /// A category with this name exists.
    Found(i64),
    /// No category has this name.
    Unknown,
    /// The lookup itself failed.
    LookupFailed(String),
}

impl CategoryResolution {
    /// Backend identifier, if the category was found.
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::Found(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether `policy` lets a row with this resolution through.
    ///
    /// Lookup failures are always accepted.
    #[must_use]
    pub const fn is_accepted(&self, policy: UnknownCategoryPolicy) -> bool {
        !matches!(
            (self, policy),
            (Self::Unknown, UnknownCategoryPolicy::Reject)
        )
    }
}

/// Message attached to rows whose category is rejected by policy.
#[must_use]
pub fn unknown_category_message(name: &str) -> String {
    format!("unknown category '{name}'")
}

/// Resolves category names for one store, case-insensitively.
pub struct CategoryResolver<'a> {
    backend: &'a dyn CatalogBackend,
    store_id: &'a str,
    cache: HashMap<String, CategoryResolution>,
}

impl<'a> CategoryResolver<'a> {
    /// Creates a resolver scoped to `store_id`.
    #[must_use]
    pub fn new(backend: &'a dyn CatalogBackend, store_id: &'a str) -> Self {
        Self {
            backend,
            store_id,
            cache: HashMap::new(),
        }
    }

    /// Looks a name up, hitting the backend once per distinct name.
    pub fn resolve(&mut self, name: &str) -> CategoryResolution {
        let key = name.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let resolution = lookup(self.backend, self.store_id, name);
        self.cache.insert(key, resolution.clone());
        resolution
    }
}

/// Single uncached lookup.
#[must_use]
pub fn lookup(backend: &dyn CatalogBackend, store_id: &str, name: &str) -> CategoryResolution {
    let filters = [
        Filter::eq("store_id", store_id),
        Filter::eq_ignore_case("name", name.trim()),
    ];
    match backend.select(CATEGORIES_TABLE, &filters) {
        Ok(records) => records
            .first()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_i64)
            .map_or(CategoryResolution::Unknown, CategoryResolution::Found),
        Err(e) => {
            tracing::debug!(store_id, category = name, error = %e, "category lookup failed");
            CategoryResolution::LookupFailed(e.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BackendError, InMemoryBackend, Record};
    use serde_json::json;

    fn category(store: &str, id: i64, name: &str) -> Record {
        let mut rec = Record::new();
        rec.insert("id".into(), json!(id));
        rec.insert("store_id".into(), json!(store));
        rec.insert("name".into(), json!(name));
        rec
    }

    #[test]
    fn test_resolves_case_insensitively_per_store() {
        let backend = InMemoryBackend::new();
        backend.seed(CATEGORIES_TABLE, category("s1", 7, "Garden Tools"));
        backend.seed(CATEGORIES_TABLE, category("s2", 8, "Kitchen"));

        let mut resolver = CategoryResolver::new(&backend, "s1");
        assert_eq!(resolver.resolve("garden tools"), CategoryResolution::Found(7));
        assert_eq!(resolver.resolve("Kitchen"), CategoryResolution::Unknown);
    }

    #[test]
    fn test_lookup_failure_is_reported_not_raised() {
        let backend = InMemoryBackend::new();
        backend.fail_selects(CATEGORIES_TABLE, BackendError::new(None, "timeout"));

        let resolution = lookup(&backend, "s1", "Tools");
        assert!(matches!(resolution, CategoryResolution::LookupFailed(ref m) if m.contains("timeout")));
        assert!(resolution.is_accepted(UnknownCategoryPolicy::Reject));
    }

    #[test]
    fn test_policy() {
        assert!(CategoryResolution::Unknown.is_accepted(UnknownCategoryPolicy::AcceptAsText));
        assert!(!CategoryResolution::Unknown.is_accepted(UnknownCategoryPolicy::Reject));
        assert!(CategoryResolution::Found(1).is_accepted(UnknownCategoryPolicy::Reject));
    }
}
