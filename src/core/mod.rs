//! Core module - cache, configuration and CSV handling

pub mod cache;
pub mod config;
pub mod csv;

pub use cache::{CacheEntryInfo, CacheError, CachedCsv, CsvCache};
pub use config::{Config, ConfigError, ServiceKind};
pub use csv::{CsvError, CsvTable};
