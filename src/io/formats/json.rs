//! JSON array codec.

use crate::models::Row;
use crate::storage::Record;
use crate::{Error, Result};
use serde_json::Value;

/// Decodes a JSON array of objects into rows.
///
/// Blank input yields no rows. Scalar values are stringified.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the text is not a JSON array of
/// objects.
pub fn decode(text: &str) -> Result<Vec<Row>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::InvalidInput(format!("Failed to parse JSON array: {e}")))?;
    let Value::Array(items) = value else {
        return Err(Error::InvalidInput(
            "JSON input must be an array of objects".to_string(),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object().map(Row::from_json_object).ok_or_else(|| {
                Error::InvalidInput(format!("JSON element {} is not an object", i + 1))
            })
        })
        .collect()
}

/// Encodes records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(records: &[Record]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| Error::OperationFailed {
        operation: "serialize_json".to_string(),
        cause: e.to_string(),
    })
}
