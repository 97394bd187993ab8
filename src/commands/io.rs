//! Import, preview, and export command handlers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use storeport::io::{
    DateRange, ExportFilters, ExportService, Format, ImportOptions, ImportService, errors_to_text,
};
use storeport::storage::CatalogBackend;
use storeport::{EngineConfig, EntityType, Error, Result, SqliteBackend};

/// Number of errors or warnings printed before truncating.
const SHOWN: usize = 10;

fn open_backend(db: &Path) -> Result<Arc<dyn CatalogBackend>> {
    Ok(Arc::new(SqliteBackend::new(db)?))
}

fn parse_format(format: Option<&str>) -> Result<Option<Format>> {
    format.map(str::parse).transpose()
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::OperationFailed {
        operation: "write_output".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

fn print_truncated<T: std::fmt::Display>(title: &str, items: &[T]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{title} ({}):", items.len());
    for item in items.iter().take(SHOWN) {
        println!("  - {item}");
    }
    if items.len() > SHOWN {
        println!("  ... and {} more", items.len() - SHOWN);
    }
}

/// Executes the import command.
pub async fn cmd_import(
    config: EngineConfig,
    db: &Path,
    store: &str,
    entity: EntityType,
    file: PathBuf,
    format: Option<String>,
    errors_out: Option<PathBuf>,
) -> Result<()> {
    let format = parse_format(format.as_deref())?;
    let service = ImportService::new(open_backend(db)?, config);

    let options = ImportOptions::new().with_progress(|progress| {
        print!(
            "\rBatch {}/{}: {}/{} rows ({:.1}%) - Imported: {}",
            progress.batch,
            progress.batches,
            progress.processed,
            progress.total,
            progress.percent_complete(),
            progress.imported,
        );
        let _ = std::io::stdout().flush();
    });

    let result = service
        .import_from_file(store, entity, &file, format, options)
        .await?;

    println!();
    println!();
    if result.success {
        println!("Import completed:");
    } else {
        println!("Import completed with errors:");
    }
    println!("  Imported: {}", result.imported);
    println!("  Failed:   {}", result.failed);

    let lines: Vec<String> = result
        .errors
        .iter()
        .map(|e| match &e.field {
            Some(field) => format!("row {}: {field}: {}", e.row, e.error),
            None => format!("row {}: {}", e.row, e.error),
        })
        .collect();
    print_truncated("Errors", &lines);

    if let Some(path) = errors_out
        && !result.errors.is_empty()
    {
        write_output(&path, &errors_to_text(&result.errors)?)?;
        println!();
        println!("Error report written to {}", path.display());
    }

    Ok(())
}

/// Executes the preview command.
pub async fn cmd_preview(
    config: EngineConfig,
    db: &Path,
    store: &str,
    entity: EntityType,
    file: PathBuf,
    format: Option<String>,
    json: bool,
) -> Result<()> {
    let format = parse_format(format.as_deref())?;
    let service = ImportService::new(open_backend(db)?, config);
    let preview = service.preview_file(store, entity, &file, format).await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&preview).map_err(|e| Error::OperationFailed {
                operation: "serialize_preview".to_string(),
                cause: e.to_string(),
            })?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Preview:");
    println!("  Total rows:   {}", preview.total_rows);
    println!("  Valid rows:   {}", preview.valid_rows);
    println!("  Invalid rows: {}", preview.invalid_rows);

    if !preview.categories_found.is_empty() {
        println!();
        println!("Categories:");
        for category in &preview.categories_found {
            match category.category_id {
                Some(id) => println!("  - {} ({} rows, id {id})", category.name, category.count),
                None => println!("  - {} ({} rows, new)", category.name, category.count),
            }
        }
    }

    let problems: Vec<String> = preview
        .per_row_verdicts
        .iter()
        .filter(|v| !v.is_valid)
        .flat_map(|v| {
            v.errors.iter().map(move |e| match &e.field {
                Some(field) => format!("row {}: {field}: {}", v.row, e.message),
                None => format!("row {}: {}", v.row, e.message),
            })
        })
        .collect();
    print_truncated("Errors", &problems);
    print_truncated("Warnings", &preview.warnings);

    Ok(())
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
///
/// A plain date means the start of that day, or its last second when
/// `end_of_day` is set.
fn parse_instant(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("invalid date '{value}': {e}")))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| Error::InvalidInput(format!("invalid date '{value}'")))
}

/// Executes the export command.
#[allow(clippy::too_many_arguments)]
pub fn cmd_export(
    db: &Path,
    store: &str,
    entity: EntityType,
    output: Option<PathBuf>,
    format: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let format = match (format.as_deref(), output.as_deref()) {
        (Some(f), _) => f.parse()?,
        (None, Some(path)) => Format::from_path(path)?,
        (None, None) => Format::default(),
    };

    let mut filters = ExportFilters::new();
    if from.is_some() || to.is_some() {
        filters = filters.with_date_range(DateRange {
            from: from.as_deref().map(|v| parse_instant(v, false)).transpose()?,
            to: to.as_deref().map(|v| parse_instant(v, true)).transpose()?,
        });
    }

    let service = ExportService::new(open_backend(db)?);
    let rendered = service.export(store, entity, &filters, format)?;

    match output {
        Some(path) => {
            write_output(&path, &rendered)?;
            eprintln!("Exported {entity} to {}", path.display());
        },
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant() {
        let start = parse_instant("2024-03-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let end = parse_instant("2024-03-01", true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-03-01T23:59:59+00:00");
        let ts = parse_instant("2024-03-01T10:00:00+02:00", false).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:00:00+00:00");
        assert!(parse_instant("yesterday", false).is_err());
    }
}
