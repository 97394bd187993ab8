//! Outcome types returned by import and preview calls.

use super::NormalizedRow;
use serde::Serialize;

/// One failed row in an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportError {
    /// Row number in the caller's numbering (1-indexed, plus header offset).
    pub row: usize,
    /// Field at fault, when the failure is field-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable reason.
    pub error: String,
}

impl ImportError {
    /// Creates a row-scoped error.
    #[must_use]
    pub fn new(row: usize, field: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_string),
            error: error.into(),
        }
    }
}

/// Result of one import call.
///
/// `imported + failed` accounts for every attempted row, and `failed`
/// always equals `errors.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// True when no row failed.
    pub success: bool,
    /// Rows written.
    pub imported: usize,
    /// Rows that failed.
    pub failed: usize,
    /// One entry per failed row.
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    /// Builds a result from the imported count and collected errors.
    #[must_use]
    pub fn new(imported: usize, errors: Vec<ImportError>) -> Self {
        Self {
            success: errors.is_empty(),
            imported,
            failed: errors.len(),
            errors,
        }
    }

    /// Result of a call rejected before any write.
    #[must_use]
    pub fn rejected(errors: Vec<ImportError>) -> Self {
        Self::new(0, errors)
    }

    /// Total rows accounted for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.imported + self.failed
    }
}

/// A validation message, optionally tied to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMessage {
    /// Field at fault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// What is wrong.
    pub message: String,
}

impl FieldMessage {
    /// Creates a field-scoped message.
    #[must_use]
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Creates a message about the row as a whole.
    #[must_use]
    pub fn row(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

/// Preview verdict for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowVerdict {
    /// Row number in the caller's numbering.
    pub row: usize,
    /// Whether the row would be imported.
    pub is_valid: bool,
    /// Validation problems; empty when valid.
    pub errors: Vec<FieldMessage>,
    /// Typed projection, present only for valid rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_data: Option<NormalizedRow>,
}

/// A category name seen during preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Category name as first written in the input.
    pub name: String,
    /// Number of valid rows naming it.
    pub count: usize,
    /// Backend identifier, when the category already exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

/// Result of a preview pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    /// Rows inspected.
    pub total_rows: usize,
    /// Rows that would be imported.
    pub valid_rows: usize,
    /// Rows that would fail.
    pub invalid_rows: usize,
    /// One verdict per input row, in input order.
    pub per_row_verdicts: Vec<RowVerdict>,
    /// Categories named by valid rows, in first-seen order.
    pub categories_found: Vec<CategorySummary>,
    /// Non-fatal problems, such as category lookup failures.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_result_accounting() {
        let result = ImportResult::new(4, vec![ImportError::new(3, Some("slug"), "bad")]);
        assert!(!result.success);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 5);

        let clean = ImportResult::new(2, Vec::new());
        assert!(clean.success);
    }

    #[test]
    fn test_preview_serializes_camel_case() {
        let preview = PreviewResult {
            total_rows: 1,
            invalid_rows: 1,
            per_row_verdicts: vec![RowVerdict {
                row: 1,
                is_valid: false,
                errors: vec![FieldMessage::field("slug", "invalid format")],
                normalized_data: None,
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["totalRows"], 1);
        assert_eq!(json["perRowVerdicts"][0]["isValid"], false);
        assert!(json["perRowVerdicts"][0].get("normalizedData").is_none());
    }
}
