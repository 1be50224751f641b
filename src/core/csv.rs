//! CSV parsing for uploaded sales and review files
//!
//! Files are read with a real CSV reader, so quoted fields, embedded commas,
//! doubled quotes and quoted newlines all survive. Headers and values are
//! trimmed, blank records are skipped, and short rows are padded with empty
//! strings. No type coercion is applied.

use std::collections::HashMap;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Number of rows shown by previews
pub const PREVIEW_ROWS: usize = 5;

/// Errors raised while validating or parsing CSV text
#[derive(Debug, Error, Diagnostic)]
pub enum CsvError {
    #[error("Please upload a CSV file")]
    #[diagnostic(
        code(dineflow::csv::not_csv),
        help("only files ending in .csv are accepted")
    )]
    NotCsv { file_name: String },

    #[error("File must contain at least a header row and one data row")]
    #[diagnostic(code(dineflow::csv::too_short))]
    TooShort,

    #[error("File must contain at least one column")]
    #[diagnostic(code(dineflow::csv::no_columns))]
    NoColumns,

    #[error("Failed to parse CSV record {record}: {message}")]
    #[diagnostic(code(dineflow::csv::malformed))]
    Malformed { record: u64, message: String },

    #[error("Failed to write CSV: {0}")]
    #[diagnostic(code(dineflow::csv::write))]
    Write(String),
}

/// A parsed CSV file: header names plus ordered rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<CsvRow>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// One data row, aligned to the table's headers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CsvRow {
    values: Vec<String>,
}

impl CsvRow {
    /// Values in header order
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Reject uploads that are not named like CSV files
pub fn check_file_name(file_name: &str) -> Result<(), CsvError> {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(CsvError::NotCsv {
            file_name: file_name.to_string(),
        })
    }
}

/// Parse CSV text into a table keyed by the first record's headers
pub fn parse(text: &str) -> Result<CsvTable, CsvError> {
    if let Some(record) = unterminated_quote(text) {
        return Err(CsvError::Malformed {
            record,
            message: "unterminated quoted field".to_string(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader
        .records()
        .enumerate()
        .map(|(i, result)| {
            result.map_err(|e| CsvError::Malformed {
                record: e.position().map(|p| p.record() + 1).unwrap_or(i as u64 + 1),
                message: e.to_string(),
            })
        })
        .filter(|result| match result {
            Ok(record) => !is_blank(record),
            Err(_) => true,
        });

    let header_record = records.next().ok_or(CsvError::TooShort)??;
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let values = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(CsvRow { values });
    }

    if rows.is_empty() {
        return Err(CsvError::TooShort);
    }
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoColumns);
    }

    Ok(CsvTable::new(headers, rows))
}

/// Record number of a quoted field still open at end of input.
///
/// Follows the reader's rules: a quote only opens a field when it is the
/// field's first byte, and a doubled quote inside a quoted field is literal.
/// Empty lines are not records.
fn unterminated_quote(text: &str) -> Option<u64> {
    let mut record = 1;
    let mut opened_at = None;
    let mut field_start = true;
    let mut record_has_content = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if opened_at.is_some() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    opened_at = None;
                }
            }
            continue;
        }
        match c {
            '\n' | '\r' => {
                if record_has_content {
                    record += 1;
                }
                record_has_content = false;
                field_start = true;
            }
            ',' => {
                record_has_content = true;
                field_start = true;
            }
            '"' if field_start => {
                opened_at = Some(record);
                record_has_content = true;
                field_start = false;
            }
            _ => {
                record_has_content = true;
                field_start = false;
            }
        }
    }

    opened_at
}

/// A whitespace-only line reads as a single empty field
fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(str::is_empty)
}

impl CsvTable {
    fn new(headers: Vec<String>, rows: Vec<CsvRow>) -> Self {
        let index = build_header_map(&headers);
        Self {
            headers,
            rows,
            index,
        }
    }

    /// Build a table from header names and row values
    ///
    /// Rows are padded or cut to the header count.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut values| {
                values.resize(width, String::new());
                CsvRow { values }
            })
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by header name
    pub fn get<'a>(&'a self, row: &'a CsvRow, header: &str) -> Option<&'a str> {
        self.index
            .get(header)
            .and_then(|&i| row.values.get(i))
            .map(String::as_str)
    }

    /// Values of one column, in row order
    pub fn column<'a>(&'a self, header: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = *self.index.get(header)?;
        Some(self.rows.iter().map(move |r| r.values[idx].as_str()))
    }

    /// First `n` rows, for previews
    pub fn head(&self, n: usize) -> &[CsvRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Serialize back to CSV, quoting only where needed
    pub fn to_csv_string(&self) -> Result<String, CsvError> {
        self.write(QuoteStyle::Necessary)
    }

    /// Serialize with every value double-quoted
    pub fn to_quoted_csv(&self) -> Result<String, CsvError> {
        self.write(QuoteStyle::Always)
    }

    fn write(&self, style: QuoteStyle) -> Result<String, CsvError> {
        let mut writer = WriterBuilder::new()
            .quote_style(style)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(&self.headers)
            .map_err(|e| CsvError::Write(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(&row.values)
                .map_err(|e| CsvError::Write(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CsvError::Write(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
    }
}

/// Map header name to column index; the first occurrence of a duplicate wins
fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(headers.len());
    for (i, h) in headers.iter().enumerate() {
        map.entry(h.clone()).or_insert(i);
    }
    map
}
