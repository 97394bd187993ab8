//! Schema validation and normalization.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]
//!
//! Each importable entity type declares its fields as a table of
//! [`FieldSpec`]s plus cross-field rules. Validation is a pure function of
//! the row, so preview and import share it verbatim; a row that passes is
//! projected into its typed [`NormalizedRow`] in the same step.

use crate::io::sanitize::sanitize;
use crate::models::{CustomerRecord, EntityType, FieldMessage, NormalizedRow, ProductRecord, Row};
use regex::Regex;
use std::sync::LazyLock;

/// Message given to every row of a non-importable entity type.
pub const ORDERS_NOT_IMPORTABLE: &str = "orders cannot be imported directly";

static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex: slug pattern")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex: email pattern")
});

/// Format predicate applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Any text.
    Text,
    /// At least this many characters after trimming.
    MinLength(usize),
    /// Lower-case kebab slug.
    Slug,
    /// Basic `local@domain.tld` shape.
    Email,
    /// Finite number strictly greater than zero.
    PositiveNumber,
    /// Integer greater than or equal to zero.
    NonNegativeInteger,
    /// `true`/`false` and common spellings.
    Boolean,
}

impl Check {
    fn message(self) -> String {
        match self {
            Self::Text => "invalid value".to_string(),
            Self::MinLength(n) => format!("must be at least {n} characters"),
            Self::Slug => "invalid format".to_string(),
            Self::Email => "invalid email format".to_string(),
            Self::PositiveNumber => "must be a number greater than 0".to_string(),
            Self::NonNegativeInteger => "must be a non-negative integer".to_string(),
            Self::Boolean => "must be true or false".to_string(),
        }
    }

    fn passes(self, value: &str) -> bool {
        match self {
            Self::Text => true,
            Self::MinLength(n) => value.chars().count() >= n,
            Self::Slug => SLUG_REGEX.is_match(value),
            Self::Email => EMAIL_REGEX.is_match(value),
            Self::PositiveNumber => parse_number(value).is_some_and(|n| n > 0.0),
            Self::NonNegativeInteger => value.parse::<u32>().is_ok(),
            Self::Boolean => parse_bool(value).is_some(),
        }
    }
}

/// Declarative description of one column.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical column name.
    pub name: &'static str,
    /// Whether an empty or absent value fails the row.
    pub required: bool,
    /// Predicate for non-empty values.
    pub check: Check,
}

const fn required(name: &'static str, check: Check) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        check,
    }
}

const fn optional(name: &'static str, check: Check) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        check,
    }
}

// Natural keys come first: a row reports only its first failing field.
const PRODUCT_FIELDS: &[FieldSpec] = &[
    required("slug", Check::Slug),
    required("name", Check::MinLength(3)),
    required("price", Check::PositiveNumber),
    optional("promotional_price", Check::PositiveNumber),
    optional("sku", Check::Text),
    optional("stock", Check::NonNegativeInteger),
    optional("category", Check::Text),
    optional("description", Check::Text),
    optional("active", Check::Boolean),
];

const CUSTOMER_FIELDS: &[FieldSpec] = &[
    required("email", Check::Email),
    required("name", Check::MinLength(2)),
    optional("phone", Check::Text),
    optional("notes", Check::Text),
];

/// Field table for an entity type; empty for types that cannot be imported.
#[must_use]
pub const fn schema(entity: EntityType) -> &'static [FieldSpec] {
    match entity {
        EntityType::Products => PRODUCT_FIELDS,
        EntityType::Customers => CUSTOMER_FIELDS,
        EntityType::Orders => &[],
    }
}

/// Outcome of validating one row.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the row passed every rule.
    pub valid: bool,
    /// The first failing rule, if any.
    pub errors: Vec<FieldMessage>,
    /// Typed projection, present exactly when `valid`.
    pub normalized: Option<NormalizedRow>,
}

impl ValidationResult {
    fn invalid(errors: Vec<FieldMessage>) -> Self {
        Self {
            valid: false,
            errors,
            normalized: None,
        }
    }

    fn valid(normalized: NormalizedRow) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            normalized: Some(normalized),
        }
    }
}

/// Validates a row against its entity schema and normalizes it.
///
/// Fields are checked in schema order and the first failure is reported, so
/// a failed row carries exactly one message. Pure: no I/O, no dependence on
/// other rows.
#[must_use]
pub fn validate(row: &Row, entity: EntityType) -> ValidationResult {
    if !entity.is_importable() {
        return orders_rejected();
    }

    let failure = schema(entity)
        .iter()
        .find_map(|spec| check_field(row, spec))
        .or_else(|| cross_field_failure(row, entity));
    if let Some(failure) = failure {
        return ValidationResult::invalid(vec![failure]);
    }

    let normalized = match entity {
        EntityType::Products => NormalizedRow::Product(normalize_product(row)),
        EntityType::Customers => NormalizedRow::Customer(normalize_customer(row)),
        EntityType::Orders => return orders_rejected(),
    };
    ValidationResult::valid(normalized)
}

fn orders_rejected() -> ValidationResult {
    ValidationResult::invalid(vec![FieldMessage::row(ORDERS_NOT_IMPORTABLE)])
}

fn cross_field_failure(row: &Row, entity: EntityType) -> Option<FieldMessage> {
    if entity != EntityType::Products {
        return None;
    }
    let price = number(row, "price")?;
    let promo = number(row, "promotional_price")?;
    (promo >= price).then(|| FieldMessage::field("promotional_price", "must be less than price"))
}

fn check_field(row: &Row, spec: &FieldSpec) -> Option<FieldMessage> {
    match text(row, spec.name) {
        None if spec.required => Some(FieldMessage::field(spec.name, "is required")),
        None => None,
        Some(value) if spec.check.passes(value) => None,
        Some(_) => Some(FieldMessage::field(spec.name, spec.check.message())),
    }
}

fn normalize_product(row: &Row) -> ProductRecord {
    ProductRecord {
        name: text(row, "name").unwrap_or_default().to_string(),
        slug: text(row, "slug").unwrap_or_default().to_string(),
        price: number(row, "price").unwrap_or_default(),
        promotional_price: number(row, "promotional_price"),
        sku: owned(row, "sku"),
        stock: text(row, "stock").and_then(|s| s.parse::<u32>().ok()).map(i64::from),
        category: owned(row, "category"),
        description: sanitized(row, "description"),
        active: text(row, "active").and_then(parse_bool).unwrap_or(true),
    }
}

fn normalize_customer(row: &Row) -> CustomerRecord {
    CustomerRecord {
        name: text(row, "name").unwrap_or_default().to_string(),
        email: text(row, "email").unwrap_or_default().to_lowercase(),
        phone: owned(row, "phone"),
        notes: sanitized(row, "notes"),
    }
}

/// Trimmed, non-empty value of a canonical column.
fn text<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.lookup(name).map(str::trim).filter(|s| !s.is_empty())
}

fn owned(row: &Row, name: &str) -> Option<String> {
    text(row, name).map(str::to_string)
}

fn number(row: &Row, name: &str) -> Option<f64> {
    text(row, name).and_then(parse_number)
}

fn sanitized(row: &Row, name: &str) -> Option<String> {
    sanitize(text(row, name))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}
