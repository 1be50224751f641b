//! `dineflow config` command - Configuration management
//!
//! Provides commands to view and modify DineFlow configuration. Edits go to
//! the file named by `--config`, or the global config file otherwise.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_yml::{Mapping, Value};
use std::fs;
use std::path::PathBuf;

use crate::cli::commands::utils::load_config;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{Config, ServiceKind};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show {
        /// Show only this key's value
        key: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache_ttl_hours, services.forecast)
        key: String,

        /// Value to set
        value: String,
    },

    /// Unset (remove) a configuration value
    Unset {
        /// Configuration key to remove
        key: String,
    },

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("cache_path", "SQLite file holding the cached CSV"),
    ("cache_ttl_hours", "Hours a cached file stays valid"),
    ("request_timeout_secs", "Timeout for each prediction request"),
    ("api_prefix", "Gradio API path prefix (\"\" for older servers)"),
    ("services.forecast", "Demand forecast service URL"),
    ("services.future_sales", "Future sales service URL"),
    ("services.scorecard", "Model scorecard service URL"),
    ("services.sentiment", "Review sentiment service URL"),
];

/// Keys holding whole numbers
const NUMERIC_KEYS: &[&str] = &["cache_ttl_hours", "request_timeout_secs"];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show { key } => run_show(key, global),
        ConfigCommands::Set { key, value } => run_set(&key, &value, global),
        ConfigCommands::Unset { key } => run_unset(&key, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(key: Option<String>, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    if let Some(key) = key {
        check_key(&key)?;
        println!("{}", get_config_value(&config, &key).unwrap_or_default());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&config).into_diagnostic()?);
        }
        _ => {
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            for (key, _) in VALID_KEYS {
                print_config_value(key, get_config_value(&config, key).as_deref());
            }

            println!();
            println!("{}", style("Config Sources (in priority order):").dim());
            println!("  1. --cache flag");
            println!("  2. Environment variables (DINEFLOW_CACHE, DINEFLOW_*_URL, ...)");
            println!("  3. --config file");
            println!("  4. Global config (~/.config/dineflow/config.yaml)");
        }
    }

    Ok(())
}

fn run_set(key: &str, value: &str, global: &GlobalOpts) -> Result<()> {
    check_key(key)?;
    let config_path = target_path(global)?;

    let mut root = read_mapping(&config_path)?;
    let yaml_value = if NUMERIC_KEYS.contains(&key) {
        let n: i64 = value
            .trim()
            .parse()
            .map_err(|_| miette::miette!("{} must be a whole number, got '{}'", key, value))?;
        serde_yml::to_value(n).into_diagnostic()?
    } else {
        Value::String(value.to_string())
    };
    set_nested_value(&mut root, key, yaml_value);

    write_mapping(&config_path, &root)?;

    println!(
        "{} Set {} {} {} in {}",
        style("✓").green(),
        style(key).cyan(),
        style("→").dim(),
        style(value).yellow(),
        config_path.display()
    );
    Ok(())
}

fn run_unset(key: &str, global: &GlobalOpts) -> Result<()> {
    check_key(key)?;
    let config_path = target_path(global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut root = read_mapping(&config_path)?;
    if !unset_nested_value(&mut root, key) {
        return Err(miette::miette!("Key '{}' not found in config", key));
    }
    write_mapping(&config_path, &root)?;

    println!(
        "{} Removed {} from {}",
        style("✓").green(),
        style(key).cyan(),
        config_path.display()
    );
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))?;

    if global.quiet {
        println!("{}", global_path.display());
        return Ok(());
    }

    println!("{}", style("Configuration file paths:").bold());
    println!();
    print_path("Global:", &global_path);
    if let Some(explicit) = &global.config {
        print_path("--config:", explicit);
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<24} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'dineflow config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

// Helper functions

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "run `dineflow config keys` to list them",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

fn target_path(global: &GlobalOpts) -> Result<PathBuf> {
    match &global.config {
        Some(path) => Ok(path.clone()),
        None => Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory")),
    }
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    let service = |kind: ServiceKind| match kind {
        ServiceKind::Forecast => config.services.forecast.clone(),
        ServiceKind::FutureSales => config.services.future_sales.clone(),
        ServiceKind::Scorecard => config.services.scorecard.clone(),
        ServiceKind::Sentiment => config.services.sentiment.clone(),
    };
    match key {
        "cache_path" => config.cache_path.as_ref().map(|p| p.display().to_string()),
        "cache_ttl_hours" => Some(config.cache_ttl_hours.to_string()),
        "request_timeout_secs" => Some(config.request_timeout_secs.to_string()),
        "api_prefix" => Some(config.api_prefix.clone()),
        _ => ServiceKind::ALL
            .iter()
            .find(|kind| key.strip_prefix("services.") == Some(kind.as_str()))
            .map(|&kind| service(kind)),
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    match value {
        Some(v) if !v.is_empty() => {
            println!("  {:<22} {}", style(key).cyan(), style(v).yellow())
        }
        Some(_) => println!("  {:<22} {}", style(key).cyan(), style("(empty)").dim()),
        None => println!("  {:<22} {}", style(key).cyan(), style("(not set)").dim()),
    }
}

fn print_path(label: &str, path: &std::path::Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!(
        "  {:<10} {} {}",
        style(label).cyan(),
        path.display(),
        state
    );
}

fn read_mapping(path: &std::path::Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: Value = serde_yml::from_str(&content)
        .map_err(|e| miette::miette!("Invalid config file {}: {}", path.display(), e))?;
    Ok(match parsed {
        Value::Mapping(_) => parsed,
        _ => Value::Mapping(Mapping::new()),
    })
}

/// Validate the edited document, then write it
fn write_mapping(path: &std::path::Path, root: &Value) -> Result<()> {
    let yaml = serde_yml::to_string(root).into_diagnostic()?;
    Config::check_file_contents(&yaml, path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    fs::write(path, yaml).into_diagnostic()
}

fn set_nested_value(root: &mut Value, key: &str, value: Value) {
    let mut current = root;
    let mut parts = key.split('.').peekable();

    while let Some(part) = parts.next() {
        let Value::Mapping(map) = current else {
            return;
        };
        let part_key = Value::String(part.to_string());
        if parts.peek().is_none() {
            map.insert(part_key, value);
            return;
        }
        let child = map
            .entry(part_key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !child.is_mapping() {
            *child = Value::Mapping(Mapping::new());
        }
        current = child;
    }
}

fn unset_nested_value(root: &mut Value, key: &str) -> bool {
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (parents.split('.').collect::<Vec<_>>(), last),
        None => (Vec::new(), key),
    };

    let mut current = root;
    for part in parents {
        match current {
            Value::Mapping(map) => match map.get_mut(part) {
                Some(next) => current = next,
                None => return false,
            },
            _ => return false,
        }
    }

    match current {
        Value::Mapping(map) => map.remove(last).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_unset_nested_values() {
        let mut root = Value::Mapping(Mapping::new());
        set_nested_value(&mut root, "services.forecast", Value::String("http://a:1/".into()));
        set_nested_value(&mut root, "cache_ttl_hours", serde_yml::to_value(6).unwrap());

        let yaml = serde_yml::to_string(&root).unwrap();
        assert!(yaml.contains("forecast:"));
        assert!(yaml.contains("http://a:1/"));
        assert!(yaml.contains("cache_ttl_hours: 6"));

        assert!(unset_nested_value(&mut root, "services.forecast"));
        assert!(!unset_nested_value(&mut root, "services.forecast"));
        assert!(!unset_nested_value(&mut root, "missing.key"));
        assert!(unset_nested_value(&mut root, "cache_ttl_hours"));
    }

    #[test]
    fn test_get_config_value() {
        let config = Config::default();
        assert_eq!(
            get_config_value(&config, "services.sentiment").as_deref(),
            Some("http://127.0.0.1:7862/")
        );
        assert_eq!(get_config_value(&config, "cache_ttl_hours").as_deref(), Some("24"));
        assert_eq!(get_config_value(&config, "services.other"), None);
    }

    #[test]
    fn test_every_listed_key_is_readable() {
        let config = Config::default();
        for (key, _) in VALID_KEYS {
            if *key != "cache_path" {
                assert!(get_config_value(&config, key).is_some(), "{}", key);
            }
        }
        assert!(check_key("services.forecast").is_ok());
        assert!(check_key("editor").is_err());
    }
}
