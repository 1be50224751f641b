//! Shared utilities for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::cache::CsvCache;
use crate::core::config::{Config, ServiceKind};
use crate::service::GradioClient;

/// Effective configuration with command-line overrides applied
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(path) = &global.cache {
        config.cache_path = Some(path.clone());
    }
    Ok(config)
}

/// Open the CSV cache named by the configuration
pub fn open_cache(config: &Config) -> Result<CsvCache> {
    let path = config.cache_path.as_deref().ok_or_else(|| {
        miette::miette!(
            help = "pass --cache <FILE> or set DINEFLOW_CACHE",
            "Could not determine a cache location"
        )
    })?;
    tracing::debug!(path = %path.display(), "opening cache");
    Ok(CsvCache::open(path)?.with_ttl(config.cache_ttl()))
}

/// HTTP client for one prediction service
pub fn service_client(config: &Config, kind: ServiceKind) -> Result<GradioClient> {
    let url = config.service_url(kind)?;
    Ok(GradioClient::new(
        url,
        &config.api_prefix,
        config.request_timeout(),
    )?)
}

/// Print a progress line unless quiet or a machine-readable format was requested
pub fn progress(global: &GlobalOpts, message: &str) {
    if !global.quiet && global.format.is_human() {
        eprintln!("{} {}", style("→").blue(), message);
    }
}

/// Write content to a file, or stdout when no path is given
pub fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            eprintln!(
                "{} Written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
