//! Wire formats for import and export.

pub mod json;

use crate::{Error, Result};
use std::path::Path;
use std::str::FromStr;

/// Supported file formats for import/export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Delimited text with a header line.
    #[default]
    Csv,
    /// JSON array of objects.
    Json,
}

impl Format {
    /// Returns all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json]
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    /// Offset from a 0-based record index to the row number reported to
    /// callers.
    ///
    /// Rows are 1-indexed; delimited text also counts its header line.
    #[must_use]
    pub const fn row_offset(&self) -> usize {
        match self {
            Self::Csv => 2,
            Self::Json => 1,
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("csv" | "txt") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some(ext) => Err(Error::InvalidInput(format!(
                "Unsupported file extension: .{ext}"
            ))),
            None => Err(Error::InvalidInput(
                "Cannot determine format: file has no extension".to_string(),
            )),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" | "text" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(Error::InvalidInput(format!("Unknown format: {s}"))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("json").unwrap(), Format::Json);
        assert_eq!(Format::from_str("CSV").unwrap(), Format::Csv);
        assert!(Format::from_str("yaml").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            Format::from_path(Path::new("products.json")).unwrap(),
            Format::Json
        );
        assert_eq!(
            Format::from_path(Path::new("export/Customers.CSV")).unwrap(),
            Format::Csv
        );
        assert!(Format::from_path(Path::new("products.xlsx")).is_err());
        assert!(Format::from_path(Path::new("products")).is_err());
    }

    #[test]
    fn test_row_offset() {
        assert_eq!(Format::Csv.row_offset(), 2);
        assert_eq!(Format::Json.row_offset(), 1);
    }
}
