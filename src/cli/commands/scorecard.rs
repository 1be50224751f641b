//! `dineflow scorecard` command - Sales model performance per item

use console::style;
use miette::Result;

use crate::analytics::load_inventory;
use crate::analytics::scorecard::{self, Grade, Timeframe};
use crate::cli::commands::utils::{load_config, open_cache, progress, service_client};
use crate::cli::output::{print_records, CellValue, Table};
use crate::cli::GlobalOpts;
use crate::core::config::ServiceKind;

#[derive(clap::Args, Debug)]
pub struct ScorecardArgs {
    /// Which metrics block to report
    #[arg(long, short = 't', value_enum, default_value_t = Timeframe::Daily)]
    pub timeframe: Timeframe,
}

pub fn run(args: ScorecardArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;
    let cached = load_inventory(&cache)?;
    let client = service_client(&config, ServiceKind::Scorecard)?;

    progress(global, &format!("Scoring {} ({})", cached.file_name, args.timeframe));
    let card = scorecard::run(&client, &cached, args.timeframe)?;

    let human = global.format.is_human() && !global.quiet;
    if human {
        println!(
            "{} {}",
            style("Model Scorecard").bold().underlined(),
            style(format!("({})", card.timeframe)).dim()
        );
        if let Some(ts) = &card.analysis_timestamp {
            println!("  Analysed: {}", ts);
        }
        println!();
    }

    let mut table = Table::new([
        "Item",
        "Score",
        "Accuracy",
        "Reliability",
        "MAE",
        "RMSE",
        "R2",
        "MAPE",
        "Grade",
    ]);
    for row in &card.rows {
        table.push(vec![
            CellValue::text(&row.item),
            CellValue::Percent(row.max_metric),
            CellValue::Percent(row.accuracy),
            CellValue::Percent(row.reliability),
            CellValue::Float(row.mae, 3),
            CellValue::Float(row.rmse, 3),
            CellValue::Float(row.r2, 3),
            CellValue::Float(row.mape, 1),
            CellValue::text(row.grade.to_string()),
        ]);
    }
    print_records(global.format, &card.rows, &table)?;

    if human {
        println!(
            "{} of {} items graded {} (score >= {})",
            style(card.good_count()).green(),
            card.rows.len(),
            style(Grade::Good).green(),
            scorecard::GOOD_THRESHOLD
        );
    }
    Ok(())
}
