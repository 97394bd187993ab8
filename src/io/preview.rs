//! Side-effect-free preview of an import.
//!
//! Runs the same validation the importer uses, flags duplicates against
//! rows already accepted earlier in the pass, and resolves category names.
//! Never writes to the backend.

use crate::config::UnknownCategoryPolicy;
use crate::io::category::{CategoryResolution, CategoryResolver, unknown_category_message};
use crate::io::uniqueness::{duplicate_message, normalize_key};
use crate::io::validation::validate;
use crate::models::{
    CategorySummary, EntityType, FieldMessage, NormalizedRow, PreviewResult, Row, RowVerdict,
};
use crate::storage::CatalogBackend;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

/// Produces per-row verdicts without writing.
#[derive(Clone)]
pub struct PreviewEngine {
    backend: Arc<dyn CatalogBackend>,
    category_policy: UnknownCategoryPolicy,
}

/// Running state of one preview pass.
struct PreviewPass<'a> {
    entity: EntityType,
    row_offset: usize,
    category_policy: UnknownCategoryPolicy,
    resolver: CategoryResolver<'a>,
    /// Natural key name -> normalized value -> caller row number.
    seen: HashMap<&'static str, HashMap<String, usize>>,
    categories: Vec<CategorySummary>,
    category_index: HashMap<String, usize>,
    warned: HashSet<String>,
    warnings: Vec<String>,
}

impl PreviewEngine {
    /// Creates a preview engine reading categories from `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogBackend>, category_policy: UnknownCategoryPolicy) -> Self {
        Self {
            backend,
            category_policy,
        }
    }

    /// Previews `rows` for `store_id`.
    ///
    /// `row_offset` maps a 0-based index to the caller's row number.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn preview(
        &self,
        store_id: &str,
        entity: EntityType,
        rows: &[Row],
        row_offset: usize,
    ) -> PreviewResult {
        let mut pass = PreviewPass {
            entity,
            row_offset,
            category_policy: self.category_policy,
            resolver: CategoryResolver::new(self.backend.as_ref(), store_id),
            seen: HashMap::new(),
            categories: Vec::new(),
            category_index: HashMap::new(),
            warned: HashSet::new(),
            warnings: Vec::new(),
        };

        let verdicts: Vec<RowVerdict> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| pass.verdict(index, row))
            .collect();

        let valid_rows = verdicts.iter().filter(|v| v.is_valid).count();
        tracing::debug!(
            entity = %entity,
            total = verdicts.len(),
            valid = valid_rows,
            warnings = pass.warnings.len(),
            "preview complete"
        );

        PreviewResult {
            total_rows: verdicts.len(),
            valid_rows,
            invalid_rows: verdicts.len() - valid_rows,
            per_row_verdicts: verdicts,
            categories_found: pass.categories,
            warnings: pass.warnings,
        }
    }
}

impl PreviewPass<'_> {
    fn verdict(&mut self, index: usize, row: &Row) -> RowVerdict {
        let row_number = index + self.row_offset;
        let validation = validate(row, self.entity);
        let mut errors = validation.errors;

        if let Some(normalized) = validation.normalized.as_ref() {
            errors.extend(self.duplicate_errors(normalized));
            if errors.is_empty() {
                errors.extend(self.category_error(normalized));
            }
        }

        let normalized = if errors.is_empty() {
            validation.normalized
        } else {
            None
        };
        if let Some(normalized) = normalized.as_ref() {
            self.remember(normalized, row_number);
        }

        RowVerdict {
            row: row_number,
            is_valid: normalized.is_some(),
            errors,
            normalized_data: normalized,
        }
    }

    fn duplicate_errors(&self, normalized: &NormalizedRow) -> Vec<FieldMessage> {
        self.entity
            .natural_keys()
            .iter()
            .filter_map(|key_name| {
                let value = normalized.natural_key(key_name)?;
                let first = self.seen.get(key_name)?.get(&normalize_key(value))?;
                Some(FieldMessage::field(
                    key_name,
                    duplicate_message(key_name, value, *first),
                ))
            })
            .collect()
    }

    fn category_error(&mut self, normalized: &NormalizedRow) -> Option<FieldMessage> {
        let name = normalized.category()?;
        let resolution = self.resolver.resolve(name);
        if let CategoryResolution::LookupFailed(reason) = &resolution
            && self.warned.insert(normalize_key(name))
        {
            self.warnings
                .push(format!("category lookup failed for '{name}': {reason}"));
        }
        if resolution.is_accepted(self.category_policy) {
            None
        } else {
            Some(FieldMessage::field(
                "category",
                unknown_category_message(name),
            ))
        }
    }

    /// Records keys and category of a row that passed.
    fn remember(&mut self, normalized: &NormalizedRow, row_number: usize) {
        for key_name in self.entity.natural_keys() {
            if let Some(value) = normalized.natural_key(key_name) {
                let key = normalize_key(value);
                if !key.is_empty() {
                    self.seen
                        .entry(*key_name)
                        .or_default()
                        .entry(key)
                        .or_insert(row_number);
                }
            }
        }

        if let Some(name) = normalized.category() {
            let key = normalize_key(name);
            if let Some(&i) = self.category_index.get(&key) {
                self.categories[i].count += 1;
            } else {
                let category_id = self.resolver.resolve(name).id();
                self.category_index.insert(key, self.categories.len());
                self.categories.push(CategorySummary {
                    name: name.to_string(),
                    count: 1,
                    category_id,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BackendError, InMemoryBackend, Record};
    use serde_json::json;

    fn engine(backend: InMemoryBackend, policy: UnknownCategoryPolicy) -> PreviewEngine {
        PreviewEngine::new(Arc::new(backend), policy)
    }

    fn product(name: &str, slug: &str, price: &str) -> Row {
        Row::new()
            .with("name", name)
            .with("slug", slug)
            .with("price", price)
    }

    #[test]
    fn test_invalid_slug_verdict() {
        let result = engine(InMemoryBackend::new(), UnknownCategoryPolicy::AcceptAsText).preview(
            "s1",
            EntityType::Products,
            &[product("X", "bad slug!", "5")],
            1,
        );

        assert_eq!(result.total_rows, 1);
        assert_eq!(result.invalid_rows, 1);
        let verdict = &result.per_row_verdicts[0];
        assert_eq!(verdict.row, 1);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors, vec![FieldMessage::field("slug", "invalid format")]);
        assert!(verdict.normalized_data.is_none());
    }

    #[test]
    fn test_progressive_duplicates() {
        let rows = [
            product("Widget A", "widget-a", "10"),
            product("Widget B", "Widget-A", "20"),
            product("Widget C", "widget-a", "30"),
        ];
        let result = engine(InMemoryBackend::new(), UnknownCategoryPolicy::AcceptAsText)
            .preview("s1", EntityType::Products, &rows, 2);

        // "Widget-A" fails the slug format before it can be a duplicate.
        assert_eq!(result.valid_rows, 1);
        let third = &result.per_row_verdicts[2];
        assert_eq!(third.row, 4);
        assert_eq!(
            third.errors,
            vec![FieldMessage::field(
                "slug",
                "duplicate slug 'widget-a' also on row 2"
            )]
        );
    }

    #[test]
    fn test_invalid_rows_do_not_claim_keys() {
        let rows = [
            product("X", "shared", "5"),
            product("Widget", "shared", "5"),
        ];
        let result = engine(InMemoryBackend::new(), UnknownCategoryPolicy::AcceptAsText)
            .preview("s1", EntityType::Products, &rows, 1);
        assert!(!result.per_row_verdicts[0].is_valid);
        assert!(result.per_row_verdicts[1].is_valid);
    }

    #[test]
    fn test_categories_summarized() {
        let backend = InMemoryBackend::new();
        let mut cat = Record::new();
        cat.insert("id".into(), json!(3));
        cat.insert("store_id".into(), json!("s1"));
        cat.insert("name".into(), json!("Tools"));
        backend.seed("categories", cat);

        let rows = [
            product("Hammer", "hammer", "5").with("category", "Tools"),
            product("Wrench", "wrench", "5").with("category", "tools"),
            product("Vase", "vase", "5").with("category", "Decor"),
            product("Bad", "bad slug", "5").with("category", "Ignored"),
        ];
        let result = engine(backend, UnknownCategoryPolicy::AcceptAsText)
            .preview("s1", EntityType::Products, &rows, 1);

        assert_eq!(result.valid_rows, 3);
        assert_eq!(
            result.categories_found,
            vec![
                CategorySummary {
                    name: "Tools".into(),
                    count: 2,
                    category_id: Some(3)
                },
                CategorySummary {
                    name: "Decor".into(),
                    count: 1,
                    category_id: None
                },
            ]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_lookup_failure_becomes_single_warning() {
        let backend = InMemoryBackend::new();
        backend.fail_selects("categories", BackendError::new(None, "timeout"));
        let rows = [
            product("Hammer", "hammer", "5").with("category", "Tools"),
            product("Wrench", "wrench", "5").with("category", "Tools"),
        ];
        let result = engine(backend, UnknownCategoryPolicy::Reject)
            .preview("s1", EntityType::Products, &rows, 1);

        assert_eq!(result.valid_rows, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Tools"));
    }

    #[test]
    fn test_reject_policy_invalidates_unknown_category() {
        let rows = [product("Vase", "vase", "5").with("category", "Decor")];
        let result = engine(InMemoryBackend::new(), UnknownCategoryPolicy::Reject)
            .preview("s1", EntityType::Products, &rows, 1);

        assert_eq!(result.invalid_rows, 1);
        assert_eq!(
            result.per_row_verdicts[0].errors,
            vec![FieldMessage::field("category", "unknown category 'Decor'")]
        );
        assert!(result.categories_found.is_empty());
    }

    #[test]
    fn test_orders_preview_all_invalid() {
        let rows = [Row::new().with("total", "5"), Row::new().with("total", "6")];
        let result = engine(InMemoryBackend::new(), UnknownCategoryPolicy::AcceptAsText)
            .preview("s1", EntityType::Orders, &rows, 1);
        assert_eq!(result.invalid_rows, 2);
    }
}
