//! `SQLite` catalog backend.
//!
//! Stores each entity table with explicit columns and the same unique indexes
//! the production schema declares. Constraint failures are reported with the
//! SQLSTATE-style codes the retry classifier understands.

use super::traits::{BackendError, CatalogBackend, Filter, FilterOp, Record};
use super::{FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION, acquire_lock};
use crate::{Error, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode, params_from_iter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    sku TEXT,
    price REAL NOT NULL,
    promotional_price REAL,
    stock INTEGER,
    category TEXT,
    category_id INTEGER REFERENCES categories(id),
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_products_store_slug ON products(store_id, slug COLLATE NOCASE);
CREATE UNIQUE INDEX IF NOT EXISTS idx_products_store_sku ON products(store_id, sku COLLATE NOCASE);
CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_customers_store_email ON customers(store_id, email COLLATE NOCASE);
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL,
    customer_email TEXT,
    status TEXT NOT NULL,
    total REAL NOT NULL,
    created_at TEXT NOT NULL
);
";

/// Columns each table accepts; anything else in a record is rejected so
/// column names never reach SQL unchecked.
fn table_columns(table: &str) -> Option<&'static [&'static str]> {
    match table {
        "categories" => Some(&["id", "store_id", "name"]),
        "products" => Some(&[
            "id",
            "store_id",
            "name",
            "slug",
            "sku",
            "price",
            "promotional_price",
            "stock",
            "category",
            "category_id",
            "description",
            "active",
            "created_at",
        ]),
        "customers" => Some(&[
            "id",
            "store_id",
            "name",
            "email",
            "phone",
            "notes",
            "created_at",
        ]),
        "orders" => Some(&[
            "id",
            "store_id",
            "customer_email",
            "status",
            "total",
            "created_at",
        ]),
        _ => None,
    }
}

/// `SQLite`-backed catalog storage.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Opens (or creates) a database file and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema fails.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: format!("{}: {e}", db_path.display()),
        })?;
        Self::init(conn, Some(db_path))
    }

    /// Creates an in-memory database (for tests and previews).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .and_then(|()| conn.execute_batch(SCHEMA))
            .map_err(|e| Error::OperationFailed {
                operation: "apply_sqlite_schema".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Returns the database path, if file-backed.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl CatalogBackend for SqliteBackend {
    #[instrument(skip(self, record), fields(table = %table))]
    fn insert(&self, table: &str, record: &Record) -> std::result::Result<(), BackendError> {
        let columns = checked_columns(table, record.keys().map(String::as_str))?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        let values: Vec<SqlValue> = columns
            .iter()
            .map(|c| to_sql_value(record.get(*c).unwrap_or(&Value::Null)))
            .collect();

        let conn = acquire_lock(&self.conn);
        conn.execute(&sql, params_from_iter(values))
            .map(|_| ())
            .map_err(map_sqlite_error)
    }

    #[instrument(skip(self, filters), fields(table = %table))]
    fn select(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> std::result::Result<Vec<Record>, BackendError> {
        checked_columns(table, filters.iter().map(|f| f.column.as_str()))?;

        let mut sql = format!("SELECT * FROM {table}");
        let mut values = Vec::with_capacity(filters.len());
        for (i, filter) in filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            let clause = match filter.op {
                FilterOp::Eq => "= ?",
                FilterOp::EqIgnoreCase => "= ? COLLATE NOCASE",
                FilterOp::Gte => ">= ?",
                FilterOp::Lte => "<= ?",
            };
            sql.push_str(&format!("{} {clause}", filter.column));
            values.push(to_sql_value(&filter.value));
        }
        sql.push_str(" ORDER BY id");

        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_error)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                let mut record = Record::new();
                for (idx, name) in names.iter().enumerate() {
                    record.insert(name.clone(), from_sql_value(row.get_ref(idx)?));
                }
                Ok(record)
            })
            .map_err(map_sqlite_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_error)
    }
}

fn checked_columns<'a>(
    table: &str,
    requested: impl Iterator<Item = &'a str>,
) -> std::result::Result<Vec<&'a str>, BackendError> {
    let allowed = table_columns(table)
        .ok_or_else(|| BackendError::with_code("42P01", format!("unknown table '{table}'")))?;
    requested
        .map(|c| {
            if allowed.contains(&c) {
                Ok(c)
            } else {
                Err(BackendError::with_code(
                    "42703",
                    format!("unknown column '{c}' on table '{table}'"),
                ))
            }
        })
        .collect()
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Maps rusqlite failures onto the backend error-code table.
fn map_sqlite_error(err: rusqlite::Error) -> BackendError {
    if let rusqlite::Error::SqliteFailure(ffi, ref msg) = err {
        let message = msg.clone().unwrap_or_else(|| err.to_string());
        return match (ffi.code, ffi.extended_code) {
            (ErrorCode::ConstraintViolation, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                BackendError::with_code(UNIQUE_VIOLATION, message)
            },
            (ErrorCode::ConstraintViolation, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                BackendError::with_code(FOREIGN_KEY_VIOLATION, message)
            },
            (ErrorCode::ConstraintViolation, rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL) => {
                BackendError::with_code("23502", message)
            },
            // Busy/locked carry no recognizable code and are retried.
            _ => BackendError::new(None, message),
        };
    }
    BackendError::new(None, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(slug: &str, sku: Option<&str>) -> Record {
        let mut rec = Record::new();
        rec.insert("store_id".into(), json!("s1"));
        rec.insert("name".into(), json!("Widget"));
        rec.insert("slug".into(), json!(slug));
        rec.insert("sku".into(), sku.map_or(Value::Null, |s| json!(s)));
        rec.insert("price".into(), json!(9.5));
        rec.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
        rec
    }

    #[test]
    fn test_insert_and_select_roundtrip() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.insert("products", &product("widget", Some("W-1"))).unwrap();

        let rows = backend
            .select("products", &[Filter::eq("store_id", "s1")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["slug"], json!("widget"));
        assert_eq!(rows[0]["price"], json!(9.5));
    }

    #[test]
    fn test_unique_violation_code() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.insert("products", &product("widget", None)).unwrap();

        let err = backend.insert("products", &product("Widget", None)).unwrap_err();
        assert_eq!(err.code(), Some(UNIQUE_VIOLATION));
    }

    #[test]
    fn test_foreign_key_violation_code() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut rec = product("widget", None);
        rec.insert("category_id".into(), json!(999));

        let err = backend.insert("products", &rec).unwrap_err();
        assert_eq!(err.code(), Some(FOREIGN_KEY_VIOLATION));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut rec = product("widget", None);
        rec.insert("price; DROP TABLE products".into(), json!(1));

        assert!(backend.insert("products", &rec).is_err());
        assert!(backend.select("nope", &[]).is_err());
    }

    #[test]
    fn test_case_insensitive_filter() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut cat = Record::new();
        cat.insert("store_id".into(), json!("s1"));
        cat.insert("name".into(), json!("Shoes"));
        backend.insert("categories", &cat).unwrap();

        let found = backend
            .select(
                "categories",
                &[
                    Filter::eq("store_id", "s1"),
                    Filter::eq_ignore_case("name", "SHOES"),
                ],
            )
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let backend = SqliteBackend::new(&path).unwrap();
            backend.insert("products", &product("widget", None)).unwrap();
        }
        let reopened = SqliteBackend::new(&path).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.select("products", &[]).unwrap().len(), 1);
    }
}
