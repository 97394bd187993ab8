//! Generic untyped row.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// One logical input or output record: an ordered mapping from column name
/// to raw string value.
///
/// Column order is preserved so a decoded file re-encodes with the same
/// header. Rows carry no identity beyond their position in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets a field, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Builder form of [`Row::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value stored under exactly `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Looks a field up by its canonical name.
    ///
    /// Header spellings are compared after [`canonical_column`], so
    /// `"Promotional Price"` answers to `promotional_price`.
    #[must_use]
    pub fn lookup(&self, canonical: &str) -> Option<&str> {
        self.get(canonical).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| canonical_column(k) == canonical)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Iterates over column names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a row from a JSON object, stringifying scalar values.
    ///
    /// `null` becomes the empty string; nested arrays and objects keep their
    /// JSON text.
    #[must_use]
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Canonical form of a column name: trimmed, lower-cased, with spaces and
/// hyphens folded to underscores.
#[must_use]
pub fn canonical_column(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut row = Row::new();
        row.insert("name", "A");
        row.insert("slug", "a");
        row.insert("name", "B");

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "slug"]);
        assert_eq!(row.get("name"), Some("B"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_lookup_by_canonical_name() {
        let row = Row::new().with("Promotional Price", "5").with("SKU", "X1");
        assert_eq!(row.lookup("promotional_price"), Some("5"));
        assert_eq!(row.lookup("sku"), Some("X1"));
        assert_eq!(row.lookup("price"), None);
    }

    #[test]
    fn test_from_json_object() {
        let obj = json!({"name": "Widget", "price": 10, "active": true, "sku": null});
        let row = Row::from_json_object(obj.as_object().unwrap());

        assert_eq!(row.get("name"), Some("Widget"));
        assert_eq!(row.get("price"), Some("10"));
        assert_eq!(row.get("active"), Some("true"));
        assert_eq!(row.get("sku"), Some(""));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let row = Row::new().with("b", "2").with("a", "1");
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"b":"2","a":"1"}"#);
    }
}
