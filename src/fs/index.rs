//! Content index used by the indexed backend.
//!
//! The index maps `(relative_path, display_name)` pairs to numeric ids, the
//! way a media database tracks files in a shared downloads collection. The
//! production implementation is a SQLite database at the root of the
//! downloads tree, so every process working on the same tree sees the same
//! entries.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Index database name inside the downloads root.
pub const INDEX_FILE: &str = ".cms-index.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    relative_path TEXT NOT NULL,
    display_name  TEXT NOT NULL,
    added_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS files_by_name ON files (display_name);
";

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: u64,
    /// Folder relative to the downloads root, `/`-separated with a trailing `/`.
    pub relative_path: String,
    pub display_name: String,
    pub added_at: DateTime<Utc>,
}

impl IndexEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: i64 = row.get("id")?;
        Ok(Self {
            id: id as u64,
            relative_path: row.get("relative_path")?,
            display_name: row.get("display_name")?,
            added_at: row.get("added_at")?,
        })
    }
}

/// Filter for index lookups: relative path contains `path_contains` and,
/// when set, the display name equals `display_name`.
#[derive(Debug, Clone, Copy)]
pub struct IndexQuery<'a> {
    pub path_contains: &'a str,
    pub display_name: Option<&'a str>,
}

impl IndexQuery<'_> {
    /// `LIKE` pattern matching `path_contains` anywhere, wildcards escaped.
    fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.path_contains.len() + 2);
        pattern.push('%');
        for c in self.path_contains.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// A queryable table of stored files.
pub trait ContentIndex: Send + Sync {
    /// Matching entries ordered by relative path ascending.
    fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<IndexEntry>>;

    /// Record a file, replacing any entry with the same path and name.
    fn insert(&self, relative_path: &str, display_name: &str) -> Result<IndexEntry>;

    /// Drop matching entries and return them.
    fn remove(&self, query: &IndexQuery<'_>) -> Result<Vec<IndexEntry>>;
}

const SELECT_MATCHING: &str = "
SELECT id, relative_path, display_name, added_at
FROM files
WHERE relative_path LIKE ?1 ESCAPE '\\'
  AND (?2 IS NULL OR display_name = ?2)
ORDER BY relative_path ASC, id ASC;
";

fn select_matching(conn: &Connection, query: &IndexQuery<'_>) -> Result<Vec<IndexEntry>> {
    let mut stmt = conn.prepare(SELECT_MATCHING)?;
    let rows = stmt.query_map(
        params![query.like_pattern(), query.display_name],
        IndexEntry::from_row,
    )?;

    let mut entries = Vec::new();
    for entry in rows {
        entries.push(entry?);
    }
    Ok(entries)
}

/// SQLite-backed content index.
#[derive(Debug)]
pub struct SqliteContentIndex {
    conn: Mutex<Connection>,
}

impl SqliteContentIndex {
    /// Open the index under `download_root`, creating an empty one if absent.
    pub fn open(download_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(download_root)?;
        let path = download_root.join(INDEX_FILE);
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // Course folders differing only in case stay apart
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Opened content index at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Whether an index has been created under `download_root`.
    pub fn exists(download_root: &Path) -> bool {
        download_root.join(INDEX_FILE).is_file()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContentIndex for SqliteContentIndex {
    fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<IndexEntry>> {
        select_matching(&self.lock(), query)
    }

    fn insert(&self, relative_path: &str, display_name: &str) -> Result<IndexEntry> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM files WHERE relative_path = ?1 AND display_name = ?2;",
            params![relative_path, display_name],
        )?;

        let added_at = Utc::now();
        tx.execute(
            "INSERT INTO files (relative_path, display_name, added_at) VALUES (?1, ?2, ?3);",
            params![relative_path, display_name, added_at],
        )?;
        let id = tx.last_insert_rowid() as u64;
        tx.commit()?;

        Ok(IndexEntry {
            id,
            relative_path: relative_path.to_string(),
            display_name: display_name.to_string(),
            added_at,
        })
    }

    fn remove(&self, query: &IndexQuery<'_>) -> Result<Vec<IndexEntry>> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = select_matching(&tx, query)?;
        for entry in &removed {
            tx.execute("DELETE FROM files WHERE id = ?1;", [entry.id as i64])?;
        }
        tx.commit()?;

        Ok(removed)
    }
}
