//! Importable entity types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog entity types the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Catalog products.
    Products,
    /// Store customers.
    Customers,
    /// Orders. Exportable, never importable: orders originate from the
    /// payment flow.
    Orders,
}

impl EntityType {
    /// Returns all entity types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Products, Self::Customers, Self::Orders]
    }

    /// Returns the entity type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Customers => "customers",
            Self::Orders => "orders",
        }
    }

    /// Returns the backend table holding this entity.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Natural keys that must be unique across one import call.
    ///
    /// The first key is mandatory on the entity; later keys may be absent.
    #[must_use]
    pub const fn natural_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Products => &["slug", "sku"],
            Self::Customers => &["email"],
            Self::Orders => &[],
        }
    }

    /// Returns whether rows of this type may be bulk imported.
    #[must_use]
    pub const fn is_importable(&self) -> bool {
        !matches!(self, Self::Orders)
    }

    /// Parses an entity type, accepting singular forms.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "products" | "product" => Some(Self::Products),
            "customers" | "customer" => Some(Self::Customers),
            "orders" | "order" => Some(Self::Orders),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("Unknown entity type: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parse() {
        assert_eq!(EntityType::parse("Products"), Some(EntityType::Products));
        assert_eq!(EntityType::parse(" customer "), Some(EntityType::Customers));
        assert_eq!(EntityType::parse("orders"), Some(EntityType::Orders));
        assert_eq!(EntityType::parse("invoices"), None);
        assert!("invoices".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_as_str_roundtrips() {
        for entity in EntityType::all() {
            assert_eq!(EntityType::parse(entity.as_str()), Some(*entity));
        }
    }

    #[test]
    fn test_orders_not_importable() {
        assert!(!EntityType::Orders.is_importable());
        assert!(EntityType::Orders.natural_keys().is_empty());
        assert!(EntityType::Products.is_importable());
    }
}
