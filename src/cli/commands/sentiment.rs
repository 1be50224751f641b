//! `dineflow sentiment` command - Review sentiment distribution

use console::style;
use miette::Result;
use std::fs;
use std::path::PathBuf;

use crate::analytics::load_inventory;
use crate::analytics::sentiment::{self, Sentiment, SentimentSummary};
use crate::cli::commands::utils::{load_config, open_cache, progress, service_client};
use crate::cli::output::{print_records, CellValue, Table};
use crate::cli::GlobalOpts;
use crate::core::config::ServiceKind;
use crate::core::csv;
use crate::service::CsvUpload;

#[derive(clap::Args, Debug)]
pub struct SentimentArgs {
    /// Reviews CSV with a `Review` column (default: the cached file)
    pub file: Option<PathBuf>,

    /// Classify with the built-in keyword lists instead of the service
    #[arg(long)]
    pub local: bool,

    /// List every review with its label
    #[arg(long)]
    pub reviews: bool,
}

pub fn run(args: SentimentArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    let upload = match &args.file {
        Some(path) => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            csv::check_file_name(&file_name)?;
            let content = fs::read_to_string(path)
                .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
            CsvUpload::new(file_name, content)
        }
        None => {
            let cache = open_cache(&config)?;
            CsvUpload::from(&load_inventory(&cache)?)
        }
    };
    let table = csv::parse(&upload.content)?;

    let summary = if args.local {
        sentiment::analyze_local(&table)?
    } else {
        let client = service_client(&config, ServiceKind::Sentiment)?;
        progress(
            global,
            &format!("Analyzing {} reviews from {}", table.len(), upload.file_name),
        );
        sentiment::analyze_remote(&client, &upload, &table)?
    };

    if args.reviews {
        print_reviews(&summary, global)
    } else {
        print_distribution(&summary, global)
    }
}

fn print_distribution(summary: &SentimentSummary, global: &GlobalOpts) -> Result<()> {
    let total = summary.counts.total();
    let mut table = Table::new(["Sentiment", "Reviews", "Share"]);
    for slice in &summary.slices {
        table.push(vec![
            CellValue::text(slice.name),
            CellValue::Number(slice.value as i64),
            CellValue::Percent(share(slice.value, total)),
        ]);
    }

    if global.format.is_human() && !global.quiet {
        println!("{}", style("Sentiment Distribution").bold().underlined());
        println!();
    }
    print_records(global.format, summary, &table)?;

    if global.format.is_human() && !global.quiet {
        print!("{} reviews analyzed", style(total).cyan());
        if summary.counts.unknown > 0 {
            print!(", {} without a label", style(summary.counts.unknown).yellow());
        }
        println!();
    }
    Ok(())
}

fn print_reviews(summary: &SentimentSummary, global: &GlobalOpts) -> Result<()> {
    let mut table = Table::new(["Review", "Sentiment"]);
    for verdict in &summary.reviews {
        table.push(vec![
            CellValue::text(&verdict.review),
            CellValue::text(verdict.sentiment.as_str()),
        ]);
    }
    print_records(global.format, &summary.reviews, &table)?;

    if global.format.is_human() && !global.quiet {
        let c = &summary.counts;
        println!(
            "{} {}  {} {}  {} {}",
            style(Sentiment::Positive).green(),
            c.positive,
            style(Sentiment::Negative).red(),
            c.negative,
            style(Sentiment::Neutral).dim(),
            c.neutral
        );
    }
    Ok(())
}

fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
