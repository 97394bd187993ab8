//! Delimited-text codec.
//!
//! Text layout: a header line, comma-separated fields, every field
//! double-quoted on output with embedded quotes doubled, `\n` between
//! records. Decoding is lenient: blank lines are skipped, short records are
//! padded with empty strings, and surrounding whitespace is trimmed.

use crate::models::{ImportError, Row};
use crate::{Error, Result};

/// Decodes delimited text into rows.
///
/// The first non-blank line is the header. Empty input yields no rows.
///
/// # Errors
///
/// Returns [`Error::Format`] if the text cannot be tokenized.
pub fn decode(text: &str) -> Result<Vec<Row>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Format(format!("record {}: {e}", line + 1)))?;
        if is_blank(&record, text) {
            continue;
        }
        let Some(names) = headers.as_ref() else {
            headers = Some(record.iter().map(str::to_string).collect());
            continue;
        };
        let row = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), record.get(i).unwrap_or_default()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Encodes rows as delimited text.
///
/// The header is taken from the first row's columns; later rows are written
/// against that header, with absent columns left empty.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn encode(rows: &[Row]) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let header: Vec<&str> = first.keys().collect();

    let mut writer = quoted_writer();
    write_record(&mut writer, header.iter().copied())?;
    for row in rows {
        write_record(
            &mut writer,
            header.iter().map(|name| row.get(name).unwrap_or_default()),
        )?;
    }
    finish(writer)
}

/// Renders an error report with columns `Row`, `Field`, `Error`.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn errors_to_text(errors: &[ImportError]) -> Result<String> {
    let mut writer = quoted_writer();
    write_record(&mut writer, ["Row", "Field", "Error"])?;
    for err in errors {
        let row = err.row.to_string();
        write_record(
            &mut writer,
            [
                row.as_str(),
                err.field.as_deref().unwrap_or_default(),
                err.error.as_str(),
            ],
        )?;
    }
    finish(writer)
}

/// A lone empty field is blank only when its source line holds nothing but
/// whitespace. A quoted `""` line is a real record with one empty value.
fn is_blank(record: &csv::StringRecord, text: &str) -> bool {
    if record.len() > 1 || record.iter().any(|field| !field.is_empty()) {
        return false;
    }
    record
        .position()
        .and_then(|pos| usize::try_from(pos.byte()).ok())
        .and_then(|start| text.get(start..))
        .is_none_or(|rest| {
            let rest = rest.trim_start_matches(['\r', '\n']);
            rest.split('\n').next().unwrap_or_default().trim().is_empty()
        })
}

fn quoted_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn write_record<'a>(
    writer: &mut csv::Writer<Vec<u8>>,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    writer
        .write_record(fields)
        .map_err(|e| Error::OperationFailed {
            operation: "write_csv".to_string(),
            cause: e.to_string(),
        })
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| Error::OperationFailed {
        operation: "flush_csv".to_string(),
        cause: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| Error::OperationFailed {
        operation: "encode_csv".to_string(),
        cause: e.to_string(),
    })
}
