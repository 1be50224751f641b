//! `dineflow future-sales` command - Predicted sales for one date

use chrono::Local;
use console::style;
use miette::Result;

use crate::analytics::future_sales::{self, FutureSales};
use crate::analytics::load_inventory;
use crate::cli::commands::utils::{load_config, open_cache, progress, service_client};
use crate::cli::output::{print_records, CellValue, Table};
use crate::cli::GlobalOpts;
use crate::core::config::ServiceKind;

#[derive(clap::Args, Debug)]
pub struct FutureSalesArgs {
    /// Date to predict, YYYY-MM-DD (default: tomorrow)
    #[arg(long)]
    pub date: Option<String>,
}

pub fn run(args: FutureSalesArgs, global: &GlobalOpts) -> Result<()> {
    let date = match &args.date {
        Some(text) => future_sales::parse_date(text)?,
        None => future_sales::default_date(Local::now().date_naive()),
    };

    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let cached = load_inventory(&cache)?;
    let client = service_client(&config, ServiceKind::FutureSales)?;

    progress(global, &format!("Predicting sales for {}", date));
    let result = future_sales::run(&client, &cached, date)?;

    if global.format.is_human() && !global.quiet {
        print_metadata(&result);
    }

    let mut table = Table::new(["Item", "Predicted sales"]);
    for bar in &result.bars {
        table.push(vec![
            CellValue::text(&bar.name),
            CellValue::Number(bar.predicted_sales),
        ]);
    }
    print_records(global.format, &result, &table)
}

fn print_metadata(result: &FutureSales) {
    let meta = &result.metadata;
    let date = meta
        .date
        .clone()
        .unwrap_or_else(|| result.date.to_string());

    println!("{}", style("Date Information").bold());
    println!("  Date:    {}", style(date).cyan());
    println!("  Day:     {}", meta.day_kind());
    if meta.is_holiday {
        println!(
            "  Holiday: {}",
            style(meta.holiday_name.as_deref().unwrap_or("yes")).green()
        );
    }
    println!();

    println!("{}", style("Season & Climate").bold());
    println!("  Season:  {}", meta.season.as_deref().unwrap_or("-"));
    if let Some(weather) = &meta.weather {
        println!(
            "  Weather: {}",
            weather.weather_main.as_deref().unwrap_or("-")
        );
        if let Some(t) = weather.temperature {
            println!("  Temp:    {}°C", t);
        }
        if let Some(h) = weather.humidity {
            println!("  Humidity: {}%", h);
        }
    }
    println!();
}
