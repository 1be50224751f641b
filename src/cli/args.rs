//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, forecast::ForecastArgs,
    future_sales::FutureSalesArgs, inventory::InventoryCommands, scorecard::ScorecardArgs,
    sentiment::SentimentArgs, status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "dineflow")]
#[command(author, version, about = "DineFlow restaurant sales analytics")]
#[command(long_about = "Cache a restaurant's sales CSV locally and run demand forecasts, \
    future sales predictions, model scorecards and review sentiment against the \
    DineFlow prediction services.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Cache database file (default: platform data directory)
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Extra config file layered over the global one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the cached sales CSV
    #[command(subcommand)]
    Inventory(InventoryCommands),

    /// Demand forecast per item over the next N days
    Forecast(ForecastArgs),

    /// Predicted sales per item for one date
    FutureSales(FutureSalesArgs),

    /// Accuracy and reliability of the sales model per item
    Scorecard(ScorecardArgs),

    /// Sentiment distribution of customer reviews
    Sentiment(SentimentArgs),

    /// Show cache and service status
    Status(StatusArgs),

    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}

impl OutputFormat {
    /// Whether decorations (headers, hints) belong on stdout
    pub fn is_human(&self) -> bool {
        matches!(self, OutputFormat::Auto)
    }
}
