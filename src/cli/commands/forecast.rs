//! `dineflow forecast` command - Demand forecast per item

use console::style;
use miette::Result;

use crate::analytics::forecast::{self, Forecast, DEFAULT_DAYS};
use crate::analytics::load_inventory;
use crate::cli::commands::utils::{load_config, open_cache, progress, service_client};
use crate::cli::output::{print_records, CellValue, Table};
use crate::cli::GlobalOpts;
use crate::core::config::ServiceKind;

#[derive(clap::Args, Debug)]
pub struct ForecastArgs {
    /// Number of days to forecast (1-365; presets 7, 10, 14, 30, 60, 90, 100)
    #[arg(long, short = 'd', default_value_t = DEFAULT_DAYS, allow_negative_numbers = true)]
    pub days: i64,
}

pub fn run(args: ForecastArgs, global: &GlobalOpts) -> Result<()> {
    // reject bad horizons before touching the cache or network
    forecast::validate_days(args.days)?;

    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let cached = load_inventory(&cache)?;
    let client = service_client(&config, ServiceKind::Forecast)?;

    progress(
        global,
        &format!("Forecasting {} days from {}", args.days, cached.file_name),
    );
    let result = forecast::run(&client, &cached, args.days)?;

    if global.format.is_human() && !global.quiet {
        print_header(&result);
    }

    let mut table = Table::new(["Item", "Predicted quantity"]);
    for point in &result.points {
        table.push(vec![
            CellValue::text(&point.name),
            CellValue::Number(point.prediction),
        ]);
    }
    print_records(global.format, &result.points, &table)?;

    if global.format.is_human() && !global.quiet {
        println!(
            "{} items, {} units in total",
            style(result.points.len()).cyan(),
            style(result.total()).cyan()
        );
    }
    Ok(())
}

fn print_header(result: &Forecast) {
    let meta = &result.metadata;
    println!("{}", style("Demand Forecast").bold().underlined());
    println!(
        "  Period: {}",
        style(
            meta.prediction_period
                .clone()
                .unwrap_or_else(|| format!("{} days", result.days))
        )
        .yellow()
    );
    if let (Some(start), Some(end)) = (&meta.start_date, &meta.end_date) {
        println!("  Dates:  {} to {}", start, end);
    }
    println!();
}
