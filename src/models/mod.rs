//! Data models for storeport.
//!
//! Rows enter as untyped [`Row`]s, leave validation as typed
//! [`NormalizedRow`]s, and every call ends in one of the result types.

mod entity;
mod normalized;
mod result;
mod row;

pub use entity::EntityType;
pub use normalized::{CustomerRecord, NormalizedRow, ProductRecord};
pub use result::{
    CategorySummary, FieldMessage, ImportError, ImportResult, PreviewResult, RowVerdict,
};
pub use row::{Row, canonical_column};
