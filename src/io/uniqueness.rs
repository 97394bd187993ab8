//! Intra-batch natural-key uniqueness.

use std::collections::HashMap;

/// A row whose key was already seen earlier in the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// 0-based index of the duplicate row.
    pub row: usize,
    /// Normalized key value.
    pub key: String,
    /// 0-based index of the row that first used the key.
    pub first_occurrence_row: usize,
}

/// Result of a uniqueness scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniquenessReport {
    /// True when no key repeats.
    pub valid: bool,
    /// Every later occurrence of a repeated key, in input order.
    pub duplicates: Vec<Duplicate>,
}

/// Normalized form used to compare keys: trimmed and lower-cased.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Message for a row whose `key_name` repeats the one on `first_row`.
///
/// `first_row` is already in the caller's numbering.
#[must_use]
pub fn duplicate_message(key_name: &str, key: &str, first_row: usize) -> String {
    format!("duplicate {key_name} '{key}' also on row {first_row}")
}

/// Scans `rows` once and flags every row whose key repeats an earlier one.
///
/// The first occurrence wins; rows with an empty or absent key are exempt.
pub fn check_uniqueness<T, F>(rows: &[T], key_extractor: F) -> UniquenessReport
where
    F: Fn(&T) -> Option<&str>,
{
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(key) = key_extractor(row).map(normalize_key) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        match first_seen.get(&key) {
            Some(&first) => duplicates.push(Duplicate {
                row: index,
                key,
                first_occurrence_row: first,
            }),
            None => {
                first_seen.insert(key, index);
            },
        }
    }

    UniquenessReport {
        valid: duplicates.is_empty(),
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let keys = ["a", "b", "A ", "c", "a"];
        let report = check_uniqueness(&keys, |k| Some(*k));

        assert!(!report.valid);
        assert_eq!(
            report.duplicates,
            vec![
                Duplicate {
                    row: 2,
                    key: "a".into(),
                    first_occurrence_row: 0
                },
                Duplicate {
                    row: 4,
                    key: "a".into(),
                    first_occurrence_row: 0
                },
            ]
        );
    }

    #[test]
    fn test_empty_keys_are_exempt() {
        let keys = [None, Some(""), Some("  "), None, Some("x")];
        let report = check_uniqueness(&keys, |k| *k);
        assert!(report.valid);
    }

    #[test]
    fn test_duplicate_message() {
        assert_eq!(
            duplicate_message("slug", "widget-a", 1),
            "duplicate slug 'widget-a' also on row 1"
        );
    }

    #[test]
    fn test_unique_input() {
        let report = check_uniqueness(&["a", "b", "c"], |k| Some(*k));
        assert_eq!(report, UniquenessReport {
            valid: true,
            duplicates: Vec::new()
        });
    }
}
