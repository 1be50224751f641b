//! `dineflow status` command - Cache and service overview

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::commands::utils::{load_config, open_cache, service_client};
use crate::cli::helpers::{format_size, format_span};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::CacheEntryInfo;
use crate::core::config::{Config, ServiceKind};

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Ping each prediction service over HTTP
    #[arg(long)]
    pub check: bool,
}

#[derive(Serialize)]
struct CacheStatus {
    path: Option<String>,
    ttl_hours: i64,
    entry: Option<CacheEntryInfo>,
}

#[derive(Serialize)]
struct ServiceStatus {
    name: &'static str,
    url: String,
    /// None when not checked
    reachable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Status {
    cache: CacheStatus,
    services: Vec<ServiceStatus>,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_cache(&config)?;

    let status = Status {
        cache: CacheStatus {
            path: config.cache_path.as_ref().map(|p| p.display().to_string()),
            ttl_hours: config.cache_ttl_hours,
            entry: cache.entries()?.into_iter().next(),
        },
        services: collect_services(&config, args.check),
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&status).into_diagnostic()?);
        }
        _ => print_dashboard(&status),
    }

    Ok(())
}

fn collect_services(config: &Config, check: bool) -> Vec<ServiceStatus> {
    ServiceKind::ALL
        .iter()
        .map(|&kind| {
            let url = config
                .service_url(kind)
                .map(|u| u.to_string())
                .unwrap_or_default();
            let (reachable, error) = if check {
                match service_client(config, kind)
                    .and_then(|c| c.ping().map_err(miette::Report::from))
                {
                    Ok(()) => (Some(true), None),
                    Err(e) => (Some(false), Some(e.to_string())),
                }
            } else {
                (None, None)
            };
            ServiceStatus {
                name: kind.as_str(),
                url,
                reachable,
                error,
            }
        })
        .collect()
}

fn print_dashboard(status: &Status) {
    let width = 48;

    println!("{}", style("DineFlow Status").bold().underlined());
    println!("{}", "═".repeat(width));
    println!();

    println!("{}", style("CACHE").bold());
    println!("{}", style("─".repeat(width)).dim());
    println!(
        "  Location:  {}",
        status.cache.path.as_deref().unwrap_or("(unknown)")
    );
    println!("  TTL:       {}h", status.cache.ttl_hours);
    match &status.cache.entry {
        Some(entry) => {
            let freshness = if entry.fresh {
                style("fresh").green()
            } else {
                style("expired").red()
            };
            println!("  File:      {}", style(&entry.file_name).cyan());
            println!(
                "  Stored:    {} ago ({})",
                format_span(Utc::now() - entry.stored_at),
                freshness
            );
            println!("  Size:      {}", format_size(entry.size_bytes));
        }
        None => println!("  File:      {}", style("(none)").dim()),
    }
    println!();

    println!("{}", style("SERVICES").bold());
    println!("{}", style("─".repeat(width)).dim());
    for service in &status.services {
        let state = match service.reachable {
            Some(true) => style("✓ up").green(),
            Some(false) => style("✗ down").red(),
            None => style("-").dim(),
        };
        println!("  {:<13} {:<28} {}", service.name, service.url, state);
        if let Some(error) = &service.error {
            println!("  {:<13} {}", "", style(error).dim());
        }
    }
}
