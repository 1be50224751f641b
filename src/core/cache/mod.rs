//! SQLite-backed cache for the most recently uploaded CSV file
//!
//! The cache holds a single slot. Every upload overwrites it, so at most one
//! file is retained. A stored file is served while it is younger than the
//! TTL (24 hours unless configured otherwise) and its content hash still
//! matches. Stale or damaged entries are evicted when `load` encounters them.

mod schema;
mod types;

pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use miette::Diagnostic;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Fixed key of the inventory slot
pub const INVENTORY_SLOT: &str = "inventory_csv_";

/// Default cache database file name inside the data directory
pub const CACHE_FILE: &str = "cache.db";

/// Default time-to-live for a stored file
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Current schema version; tables are rebuilt on mismatch
const SCHEMA_VERSION: i32 = 1;

/// Errors raised by the CSV cache
#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("Failed to prepare cache directory {path}: {source}")]
    #[diagnostic(code(dineflow::cache::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache database error: {0}")]
    #[diagnostic(
        code(dineflow::cache::sqlite),
        help("the cache is disposable; `dineflow inventory clear` resets it")
    )]
    Sqlite(#[from] rusqlite::Error),
}

/// The CSV cache backed by SQLite
pub struct CsvCache {
    conn: Connection,
    path: Option<PathBuf>,
    ttl: Duration,
}

impl CsvCache {
    /// Open or create the cache database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut cache = Self {
            conn,
            path: Some(path.to_path_buf()),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        };
        cache.ensure_schema()?;
        Ok(cache)
    }

    /// Open a throwaway in-memory cache
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let mut cache = Self {
            conn: Connection::open_in_memory()?,
            path: None,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        };
        cache.ensure_schema()?;
        Ok(cache)
    }

    /// Replace the time-to-live applied on load
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Database location, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store a file, replacing whatever was cached before
    pub fn store(&self, file_name: &str, content: &str) -> Result<CachedCsv, CacheError> {
        self.store_at(file_name, content, Utc::now())
    }

    pub fn store_at(
        &self,
        file_name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedCsv, CacheError> {
        self.conn.execute(
            r#"INSERT OR REPLACE INTO csv_cache
                   (slot, file_name, csv_content, content_hash, stored_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                INVENTORY_SLOT,
                file_name,
                content,
                compute_hash(content),
                now.timestamp_millis()
            ],
        )?;

        tracing::info!(file = file_name, bytes = content.len(), "stored csv in cache");

        Ok(CachedCsv {
            file_name: file_name.to_string(),
            content: content.to_string(),
            stored_at: from_millis(now.timestamp_millis()),
        })
    }

    /// Load the cached file if it is present and fresh
    pub fn load(&self) -> Result<Option<CachedCsv>, CacheError> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<CachedCsv>, CacheError> {
        let row = self
            .conn
            .query_row(
                "SELECT file_name, csv_content, content_hash, stored_at FROM csv_cache WHERE slot = ?1",
                params![INVENTORY_SLOT],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((file_name, content, hash, stored_at)) = row else {
            tracing::debug!("cache miss: slot empty");
            return Ok(None);
        };

        if compute_hash(&content) != hash {
            tracing::warn!(file = %file_name, "cached csv failed integrity check, evicting");
            self.clear()?;
            return Ok(None);
        }

        let entry = CachedCsv {
            file_name,
            content,
            stored_at: from_millis(stored_at),
        };

        if entry.age(now) >= self.ttl {
            tracing::warn!(
                file = %entry.file_name,
                stored_at = %entry.stored_at,
                "cached csv expired, evicting"
            );
            self.clear()?;
            return Ok(None);
        }

        tracing::debug!(file = %entry.file_name, "cache hit");
        Ok(Some(entry))
    }

    /// List stored files, newest first, regardless of freshness
    pub fn entries(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        self.entries_at(Utc::now())
    }

    pub fn entries_at(&self, now: DateTime<Utc>) -> Result<Vec<CacheEntryInfo>, CacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT file_name, LENGTH(CAST(csv_content AS BLOB)), stored_at FROM csv_cache ORDER BY stored_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (file_name, size, stored_at) = row?;
            let stored_at = from_millis(stored_at);
            entries.push(CacheEntryInfo {
                file_name,
                stored_at,
                size_bytes: size.max(0) as usize,
                fresh: now - stored_at < self.ttl,
            });
        }
        Ok(entries)
    }

    /// Remove the cached file; returns whether anything was removed
    pub fn clear(&self) -> Result<bool, CacheError> {
        let removed = self
            .conn
            .execute("DELETE FROM csv_cache WHERE slot = ?1", params![INVENTORY_SLOT])?;
        if removed > 0 {
            tracing::info!("cleared cached csv");
        }
        Ok(removed > 0)
    }
}

/// Default on-disk location of the cache database
pub fn default_cache_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dineflow").map(|dirs| dirs.data_dir().join(CACHE_FILE))
}

/// Compute SHA256 hash of content
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
