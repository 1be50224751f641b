//! Cache record types

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A CSV file held in the cache slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedCsv {
    pub file_name: String,
    pub content: String,
    pub stored_at: DateTime<Utc>,
}

impl CachedCsv {
    /// Time elapsed since the file was stored (negative if stored "in the future")
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.stored_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Listing entry for a stored file, without its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    pub file_name: String,
    pub stored_at: DateTime<Utc>,
    pub size_bytes: usize,
    pub fresh: bool,
}
