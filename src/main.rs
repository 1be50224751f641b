use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use dineflow::cli::commands;
use dineflow::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(global.verbose);

    match cli.command {
        Commands::Inventory(cmd) => commands::inventory::run(cmd, &global),
        Commands::Forecast(args) => commands::forecast::run(args, &global),
        Commands::FutureSales(args) => commands::future_sales::run(args, &global),
        Commands::Scorecard(args) => commands::scorecard::run(args, &global),
        Commands::Sentiment(args) => commands::sentiment::run(args, &global),
        Commands::Status(args) => commands::status::run(args, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Log to stderr; `-v` forces debug, otherwise RUST_LOG or warn
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dineflow=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
