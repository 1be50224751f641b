//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use url::Url;

use crate::core::cache::{default_cache_path, DEFAULT_TTL_HOURS};

/// Default Gradio API prefix
pub const DEFAULT_API_PREFIX: &str = "/gradio_api";

/// Default request timeout for prediction services
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors raised while loading configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    #[diagnostic(code(dineflow::config::read))]
    Read { path: PathBuf, message: String },

    #[error("Invalid config file {path}: {message}")]
    #[diagnostic(code(dineflow::config::parse))]
    Parse { path: PathBuf, message: String },

    #[error("Invalid URL for {service} service: {url}")]
    #[diagnostic(
        code(dineflow::config::url),
        help("service URLs look like http://127.0.0.1:7861/")
    )]
    InvalidUrl { service: &'static str, url: String },

    #[error("Invalid value for {key}: {value}")]
    #[diagnostic(code(dineflow::config::value))]
    InvalidValue { key: &'static str, value: String },
}

/// The prediction services a command can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Forecast,
    FutureSales,
    Scorecard,
    Sentiment,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Forecast,
        ServiceKind::FutureSales,
        ServiceKind::Scorecard,
        ServiceKind::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Forecast => "forecast",
            ServiceKind::FutureSales => "future_sales",
            ServiceKind::Scorecard => "scorecard",
            ServiceKind::Sentiment => "sentiment",
        }
    }

    fn env_var(&self) -> &'static str {
        match self {
            ServiceKind::Forecast => "DINEFLOW_FORECAST_URL",
            ServiceKind::FutureSales => "DINEFLOW_FUTURE_SALES_URL",
            ServiceKind::Scorecard => "DINEFLOW_SCORECARD_URL",
            ServiceKind::Sentiment => "DINEFLOW_SENTIMENT_URL",
        }
    }
}

/// Prediction service base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUrls {
    pub forecast: String,
    pub future_sales: String,
    pub scorecard: String,
    pub sentiment: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            forecast: "http://127.0.0.1:7861/".to_string(),
            future_sales: "http://127.0.0.1:7860/".to_string(),
            scorecard: "http://127.0.0.1:7863/".to_string(),
            sentiment: "http://127.0.0.1:7862/".to_string(),
        }
    }
}

/// One config file layer; every field optional so layers merge cleanly
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    cache_path: Option<PathBuf>,
    cache_ttl_hours: Option<i64>,
    request_timeout_secs: Option<u64>,
    api_prefix: Option<String>,
    services: ServiceLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceLayer {
    forecast: Option<String>,
    future_sales: Option<String>,
    scorecard: Option<String>,
    sentiment: Option<String>,
}

/// Effective DineFlow configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// SQLite file holding the CSV cache
    pub cache_path: Option<PathBuf>,

    /// Hours a cached file stays valid
    pub cache_ttl_hours: i64,

    /// Per-request timeout for prediction services
    pub request_timeout_secs: u64,

    /// Path prefix of the Gradio HTTP API ("" for older servers)
    pub api_prefix: String,

    pub services: ServiceUrls,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            cache_ttl_hours: DEFAULT_TTL_HOURS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            services: ServiceUrls::default(),
        }
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/dineflow/config.yaml), skipped if unreadable
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match Self::read_layer(&global_path) {
                    Ok(layer) => config.merge(layer),
                    Err(e) => tracing::warn!(error = %e, "ignoring global config"),
                }
            }
        }

        // 3. Explicit --config file, which must be valid
        if let Some(path) = explicit {
            config.merge(Self::read_layer(path)?);
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok())?;

        config.validate()?;
        Ok(config)
    }

    /// Check that YAML text is a valid config file on its own
    pub fn check_file_contents(contents: &str, path: &Path) -> Result<(), ConfigError> {
        let mut config = Config::default();
        config.merge(Self::parse_layer(contents, path)?);
        config.validate()
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dineflow")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn read_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse_layer(&contents, path)
    }

    fn parse_layer(contents: &str, path: &Path) -> Result<ConfigLayer, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(ConfigLayer::default());
        }
        serde_yml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Merge another layer into this one (other takes precedence)
    fn merge(&mut self, other: ConfigLayer) {
        if other.cache_path.is_some() {
            self.cache_path = other.cache_path;
        }
        if let Some(ttl) = other.cache_ttl_hours {
            self.cache_ttl_hours = ttl;
        }
        if let Some(timeout) = other.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(prefix) = other.api_prefix {
            self.api_prefix = prefix;
        }
        if let Some(url) = other.services.forecast {
            self.services.forecast = url;
        }
        if let Some(url) = other.services.future_sales {
            self.services.future_sales = url;
        }
        if let Some(url) = other.services.scorecard {
            self.services.scorecard = url;
        }
        if let Some(url) = other.services.sentiment {
            self.services.sentiment = url;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = var("DINEFLOW_CACHE") {
            self.cache_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = var("DINEFLOW_CACHE_TTL_HOURS") {
            self.cache_ttl_hours = ttl.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "DINEFLOW_CACHE_TTL_HOURS",
                value: ttl.clone(),
            })?;
        }
        if let Some(timeout) = var("DINEFLOW_TIMEOUT_SECS") {
            self.request_timeout_secs =
                timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DINEFLOW_TIMEOUT_SECS",
                    value: timeout.clone(),
                })?;
        }
        if let Some(prefix) = var("DINEFLOW_API_PREFIX") {
            self.api_prefix = prefix;
        }
        for kind in ServiceKind::ALL {
            if let Some(url) = var(kind.env_var()) {
                *self.service_url_mut(kind) = url;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ttl_in_range = chrono::Duration::try_hours(self.cache_ttl_hours).is_some();
        if self.cache_ttl_hours <= 0 || !ttl_in_range {
            return Err(ConfigError::InvalidValue {
                key: "cache_ttl_hours",
                value: self.cache_ttl_hours.to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                value: self.request_timeout_secs.to_string(),
            });
        }
        for kind in ServiceKind::ALL {
            self.service_url(kind)?;
        }
        Ok(())
    }

    /// Parsed base URL of a prediction service
    pub fn service_url(&self, kind: ServiceKind) -> Result<Url, ConfigError> {
        let raw = match kind {
            ServiceKind::Forecast => &self.services.forecast,
            ServiceKind::FutureSales => &self.services.future_sales,
            ServiceKind::Scorecard => &self.services.scorecard,
            ServiceKind::Sentiment => &self.services.sentiment,
        };
        Url::parse(raw)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| ConfigError::InvalidUrl {
                service: kind.as_str(),
                url: raw.clone(),
            })
    }

    fn service_url_mut(&mut self, kind: ServiceKind) -> &mut String {
        match kind {
            ServiceKind::Forecast => &mut self.services.forecast,
            ServiceKind::FutureSales => &mut self.services.future_sales,
            ServiceKind::Scorecard => &mut self.services.scorecard,
            ServiceKind::Sentiment => &mut self.services.sentiment,
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.cache_ttl_hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
