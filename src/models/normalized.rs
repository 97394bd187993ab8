//! Typed projections of validated rows.
//!
//! The schema validator turns a raw [`Row`](super::Row) into one of these
//! shapes. Preview verdicts and the row writer work on the typed form and
//! never re-read strings. The import's uniqueness gate runs earlier, on the
//! raw rows.

use super::EntityType;
use crate::storage::Record;
use serde::Serialize;
use serde_json::Value;

/// A validated product row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    /// Display name.
    pub name: String,
    /// URL slug, lower-case kebab.
    pub slug: String,
    /// Base price, strictly positive.
    pub price: f64,
    /// Promotional price, positive and below `price`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotional_price: Option<f64>,
    /// Stock keeping unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Units on hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    /// Free-text category name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sanitized description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the product is listed.
    pub active: bool,
}

/// A validated customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    /// Full name.
    pub name: String,
    /// Email address, trimmed and lower-cased.
    pub email: String,
    /// Phone number as given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Sanitized operator notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Normalized row, tagged by entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRow {
    /// A product.
    Product(ProductRecord),
    /// A customer.
    Customer(CustomerRecord),
}

impl NormalizedRow {
    /// Entity type this row belongs to.
    #[must_use]
    pub const fn entity(&self) -> EntityType {
        match self {
            Self::Product(_) => EntityType::Products,
            Self::Customer(_) => EntityType::Customers,
        }
    }

    /// Returns the value of a natural key, if the row carries one.
    ///
    /// Unknown key names and absent optional keys yield `None`.
    #[must_use]
    pub fn natural_key(&self, key: &str) -> Option<&str> {
        match (self, key) {
            (Self::Product(p), "slug") => Some(p.slug.as_str()),
            (Self::Product(p), "sku") => p.sku.as_deref(),
            (Self::Customer(c), "email") => Some(c.email.as_str()),
            _ => None,
        }
    }

    /// Returns the product category name, if any.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Product(p) => p.category.as_deref(),
            Self::Customer(_) => None,
        }
    }

    /// Builds the backend record for this row, scoped to `store_id`.
    ///
    /// Write-time columns (timestamps, resolved foreign keys) are added by the
    /// row writer.
    #[must_use]
    pub fn to_record(&self, store_id: &str) -> Record {
        let mut record = Record::new();
        record.insert("store_id".into(), Value::from(store_id));
        match self {
            Self::Product(p) => {
                record.insert("name".into(), Value::from(p.name.as_str()));
                record.insert("slug".into(), Value::from(p.slug.as_str()));
                record.insert("price".into(), Value::from(p.price));
                record.insert(
                    "promotional_price".into(),
                    p.promotional_price.map_or(Value::Null, Value::from),
                );
                record.insert("sku".into(), opt_str(p.sku.as_deref()));
                record.insert("stock".into(), p.stock.map_or(Value::Null, Value::from));
                record.insert("category".into(), opt_str(p.category.as_deref()));
                record.insert("description".into(), opt_str(p.description.as_deref()));
                record.insert("active".into(), Value::Bool(p.active));
            },
            Self::Customer(c) => {
                record.insert("name".into(), Value::from(c.name.as_str()));
                record.insert("email".into(), Value::from(c.email.as_str()));
                record.insert("phone".into(), opt_str(c.phone.as_deref()));
                record.insert("notes".into(), opt_str(c.notes.as_deref()));
            },
        }
        record
    }
}

fn opt_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NormalizedRow {
        NormalizedRow::Product(ProductRecord {
            name: "Widget".into(),
            slug: "widget".into(),
            price: 10.0,
            promotional_price: None,
            sku: Some("W-1".into()),
            stock: Some(3),
            category: Some("Tools".into()),
            description: None,
            active: true,
        })
    }

    #[test]
    fn test_natural_keys() {
        let row = widget();
        assert_eq!(row.natural_key("slug"), Some("widget"));
        assert_eq!(row.natural_key("sku"), Some("W-1"));
        assert_eq!(row.natural_key("email"), None);
        assert_eq!(row.category(), Some("Tools"));
        assert_eq!(row.entity(), EntityType::Products);
    }

    #[test]
    fn test_to_record_is_store_scoped() {
        let record = widget().to_record("store-9");
        assert_eq!(record["store_id"], Value::from("store-9"));
        assert_eq!(record["price"], Value::from(10.0));
        assert_eq!(record["promotional_price"], Value::Null);
        assert_eq!(record["active"], Value::Bool(true));
    }

    #[test]
    fn test_serializes_untagged() {
        let row = NormalizedRow::Customer(CustomerRecord {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            notes: None,
        });
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["email"], "ana@example.com");
        assert!(json.get("phone").is_none());
    }
}
