//! Read-only `SQLite` reader for Cursor's state.vscdb.
//!
//! Extracts conversation records from the `cursorDiskKV` table. The store is
//! the live file of a running desktop app, so it is only ever opened with
//! read-only flags and `query_only` set.

use std::path::Path;
use std::thread;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};

use crate::domain::{AppError, RawRecord, Result, StoreOptions};

/// Table holding Cursor's key/value records.
const KV_TABLE: &str = "cursorDiskKV";

/// Key prefixes used in Cursor's KV store.
pub const COMPOSER_PREFIX: &str = "composerData:";
pub const BUBBLE_PREFIX: &str = "bubbleId:";

/// `SQLite` reader for the conversation store. Closing happens on drop.
pub struct StoreReader {
    conn: Connection,
}

impl StoreReader {
    /// Opens the store in read-only mode, retrying briefly while it is locked.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the file is missing, is not a Cursor
    /// store, or stays locked past the retry budget.
    pub fn open(path: &Path, options: &StoreOptions) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::store_unavailable(path, "file does not exist"));
        }
        if !path.is_file() {
            return Err(AppError::store_unavailable(path, "not a file"));
        }

        let mut attempt = 0;
        loop {
            match Self::try_open(path, options) {
                Ok(Some(conn)) => {
                    tracing::debug!("Opened store: {}", path.display());
                    return Ok(Self { conn });
                }
                Ok(None) => {
                    return Err(AppError::store_unavailable(
                        path,
                        format!("table {KV_TABLE} not found"),
                    ));
                }
                Err(e) if is_contention(&e) && attempt < options.open_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = options.open_retries,
                        "Store is locked, retrying in {:?}",
                        options.retry_delay
                    );
                    thread::sleep(options.retry_delay);
                }
                Err(e) => return Err(AppError::store_unavailable(path, e.to_string())),
            }
        }
    }

    /// Opens a connection and checks for the KV table. `Ok(None)` means the
    /// file is a database without the table.
    fn try_open(path: &Path, options: &StoreOptions) -> rusqlite::Result<Option<Connection>> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )?;

        let has_table: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [KV_TABLE],
            |row| row.get(0),
        )?;

        Ok(has_table.then_some(conn))
    }

    /// Fetches all composer (conversation) entries.
    ///
    /// # Errors
    /// Returns error if query fails.
    pub fn fetch_composers(&self) -> Result<Vec<RawRecord>> {
        self.fetch_by_prefix(COMPOSER_PREFIX)
    }

    /// Fetches all bubble (message body) entries.
    ///
    /// # Errors
    /// Returns error if query fails.
    pub fn fetch_bubbles(&self) -> Result<Vec<RawRecord>> {
        self.fetch_by_prefix(BUBBLE_PREFIX)
    }

    /// Fetches entries matching a key prefix.
    fn fetch_by_prefix(&self, prefix: &str) -> Result<Vec<RawRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM cursorDiskKV WHERE key LIKE ?1")
            .map_err(AppError::database)?;

        let pattern = format!("{prefix}%");
        let rows = stmt
            .query_map([&pattern], |row| {
                let key: String = row.get(0)?;
                // Handle both TEXT and BLOB value types
                let value = match row.get_ref(1)? {
                    ValueRef::Blob(b) => b.to_vec(),
                    ValueRef::Text(t) => t.to_vec(),
                    _ => Vec::new(),
                };
                Ok(RawRecord::new(key, value))
            })
            .map_err(AppError::database)?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to read row: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} entries with prefix '{}'", entries.len(), prefix);

        Ok(entries)
    }
}

/// Busy and locked errors are the only ones worth retrying.
fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
