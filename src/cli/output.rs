//! Output rendering for command results
//!
//! Commands hand over two views of their result: the serializable records
//! (for `json`/`yaml`) and a `Table` of typed cells (for everything else).
//! `auto` draws a boxed table for humans; `md`, `csv` and `tsv` are meant
//! for reports and piping.

use chrono::{DateTime, Local, Utc};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;

/// Longest text shown in a human-readable table cell
const MAX_TEXT_WIDTH: usize = 60;

/// A typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(i64),
    /// Float with a fixed number of decimals
    Float(f64, usize),
    /// Percentage with one decimal
    Percent(f64),
    DateTime(DateTime<Utc>),
    Flag(bool),
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Full-fidelity value for machine-readable formats
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Float(f, precision) => format!("{:.prec$}", f, prec = precision),
            CellValue::Percent(p) => format!("{:.1}", p),
            CellValue::DateTime(dt) => dt.to_rfc3339(),
            CellValue::Flag(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Value as shown to a person
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => truncate_str(s, MAX_TEXT_WIDTH),
            CellValue::Percent(p) => format!("{:.1}%", p),
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d %H:%M").to_string()
            }
            CellValue::Flag(b) => String::from(if *b { "yes" } else { "no" }),
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        }
    }

    /// Display value with pipes escaped for Markdown tables
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Text(s) => s.clone(),
            other => other.display(),
        };
        raw.replace('|', "\\|")
    }
}

/// Rows of typed cells under a fixed header
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn build(&self, cell: impl Fn(&CellValue) -> String) -> tabled::Table {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().map(&cell));
        }
        builder.build()
    }

    pub fn to_pretty(&self) -> String {
        self.build(CellValue::display)
            .with(Style::rounded())
            .to_string()
    }

    pub fn to_markdown(&self) -> String {
        self.build(CellValue::format_md)
            .with(Style::markdown())
            .to_string()
    }

    pub fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.headers).into_diagnostic()?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(CellValue::raw))
                .into_diagnostic()?;
        }
        let bytes = writer.into_inner().into_diagnostic()?;
        String::from_utf8(bytes).into_diagnostic()
    }
}

/// Render `records` (json/yaml) or `table` (everything else) as a string
pub fn render<T: Serialize + ?Sized>(
    format: OutputFormat,
    records: &T,
    table: &Table,
) -> Result<String> {
    let mut out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(records).into_diagnostic()?,
        OutputFormat::Yaml => return serde_yml::to_string(records).into_diagnostic(),
        OutputFormat::Csv => return table.to_delimited(b','),
        OutputFormat::Tsv => return table.to_delimited(b'\t'),
        OutputFormat::Md => table.to_markdown(),
        OutputFormat::Auto => table.to_pretty(),
    };
    out.push('\n');
    Ok(out)
}

/// Print records in the requested format
pub fn print_records<T: Serialize + ?Sized>(
    format: OutputFormat,
    records: &T,
    table: &Table,
) -> Result<()> {
    print!("{}", render(format, records, table)?);
    Ok(())
}
