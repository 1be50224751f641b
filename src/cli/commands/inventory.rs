//! `dineflow inventory` command - Manage the cached sales CSV
//!
//! The cache holds one file at a time. `upload` validates and stores a CSV,
//! replacing whatever was there; the analytics commands read it back until
//! it expires.

use chrono::Utc;
use clap::Subcommand;
use console::style;
use miette::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::load_inventory;
use crate::cli::commands::utils::{load_config, open_cache, write_output};
use crate::cli::helpers::{format_size, format_span, plural};
use crate::cli::output::{print_records, CellValue, Table};
use crate::cli::GlobalOpts;
use crate::core::csv::{self, CsvTable, PREVIEW_ROWS};

#[derive(Subcommand, Debug)]
pub enum InventoryCommands {
    /// Validate a CSV file, cache it and preview it
    Upload {
        /// Path to the sales CSV
        file: PathBuf,
    },

    /// Preview the cached file
    Show {
        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = PREVIEW_ROWS)]
        rows: usize,
    },

    /// List cached files with their age and freshness
    List,

    /// Write the cached data back out as CSV, every value quoted
    Export {
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Remove the cached file
    Clear,
}

pub fn run(cmd: InventoryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        InventoryCommands::Upload { file } => run_upload(&file, global),
        InventoryCommands::Show { rows } => run_show(rows, global),
        InventoryCommands::List => run_list(global),
        InventoryCommands::Export { output } => run_export(output, global),
        InventoryCommands::Clear => run_clear(global),
    }
}

fn run_upload(file: &Path, global: &GlobalOpts) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    csv::check_file_name(&file_name)?;

    let content = fs::read_to_string(file)
        .map_err(|e| miette::miette!("Failed to read {}: {}", file.display(), e))?;
    let table = csv::parse(&content)?;

    let saved = load_config(global)
        .and_then(|config| open_cache(&config))
        .and_then(|cache| {
            cache
                .store(&file_name, &content)
                .map_err(miette::Report::from)
        });
    match saved {
        Ok(_) => tracing::info!(file = %file_name, rows = table.len(), "cached upload"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to cache upload");
            eprintln!("{}", style("Warning: Failed to save data locally.").yellow());
        }
    }

    if global.format.is_human() && !global.quiet {
        println!(
            "{} Loaded {} ({}, {})",
            style("✓").green(),
            style(&file_name).cyan(),
            plural(table.len(), "row"),
            plural(table.headers().len(), "column")
        );
        println!();
    }
    print_preview(&table, PREVIEW_ROWS, global)
}

fn run_show(rows: usize, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let cached = load_inventory(&cache)?;
    let table = csv::parse(&cached.content)?;

    if global.format.is_human() && !global.quiet {
        let now = Utc::now();
        println!(
            "{} {}",
            style(&cached.file_name).cyan().bold(),
            style(format!(
                "stored {} ago, expires in {}",
                format_span(cached.age(now)),
                format_span(cached.expires_at(cache.ttl()) - now)
            ))
            .dim()
        );
        println!();
    }
    print_preview(&table, rows, global)
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let entries = cache.entries()?;

    if entries.is_empty() && global.format.is_human() {
        println!("{}", style("No cached files").dim());
        return Ok(());
    }

    let now = Utc::now();
    let mut table = Table::new(["File", "Stored", "Age", "Size", "Fresh"]);
    for entry in &entries {
        table.push(vec![
            CellValue::text(&entry.file_name),
            CellValue::DateTime(entry.stored_at),
            CellValue::text(format_span(now - entry.stored_at)),
            CellValue::text(format_size(entry.size_bytes)),
            CellValue::Flag(entry.fresh),
        ]);
    }
    print_records(global.format, &entries, &table)
}

fn run_export(output: Option<PathBuf>, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let cached = load_inventory(&cache)?;
    let table = csv::parse(&cached.content)?;

    write_output(&table.to_quoted_csv()?, output)
}

fn run_clear(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;

    if cache.clear()? {
        if !global.quiet {
            println!("{} Cleared cached file", style("✓").green());
        }
    } else if !global.quiet {
        println!("{}", style("Cache is already empty").dim());
    }
    Ok(())
}

/// First `limit` rows as header-keyed records, in column order
fn preview_records(table: &CsvTable, limit: usize) -> Vec<Map<String, Value>> {
    table
        .head(limit)
        .iter()
        .map(|row| {
            table
                .headers()
                .iter()
                .zip(row.values())
                .map(|(h, v)| (h.clone(), Value::String(v.clone())))
                .collect()
        })
        .collect()
}

fn print_preview(table: &CsvTable, limit: usize, global: &GlobalOpts) -> Result<()> {
    let mut out = Table::new(table.headers().iter().cloned());
    for row in table.head(limit) {
        out.push(row.values().iter().map(CellValue::text).collect());
    }
    print_records(global.format, &preview_records(table, limit), &out)?;

    if global.format.is_human() && !global.quiet {
        println!(
            "{}",
            style(format!(
                "Showing first {} rows of {} total rows",
                out.len(),
                table.len()
            ))
            .dim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_records_keep_column_order() {
        let table = csv::parse("item_name,quantity,date\nChai,3,01-10-2024\nSamosa,2,01-10-2024\n")
            .unwrap();
        let records = preview_records(&table, 1);
        assert_eq!(records.len(), 1);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, ["item_name", "quantity", "date"]);
        assert_eq!(records[0]["quantity"], Value::String("3".into()));
    }
}
