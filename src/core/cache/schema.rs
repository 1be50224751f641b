//! Database schema initialization

use rusqlite::params;

use super::{CacheError, CsvCache, SCHEMA_VERSION};

impl CsvCache {
    /// Create tables if missing, or rebuild them when the schema version changed
    pub(super) fn ensure_schema(&mut self) -> Result<(), CacheError> {
        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current == SCHEMA_VERSION {
            return Ok(());
        }

        if current != 0 {
            tracing::info!(
                from = current,
                to = SCHEMA_VERSION,
                "cache schema changed, rebuilding"
            );
        }

        self.conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS schema_version;
            DROP TABLE IF EXISTS csv_cache;

            -- Schema version tracking
            CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per slot; uploads overwrite the row
            CREATE TABLE csv_cache (
                slot TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                csv_content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }
}
