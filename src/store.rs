use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

/// One processed input: who sent it and what they said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub sender: String,
    pub message: String,
}

/// Result of reading the log. The `user` table is created lazily on first
/// append, so reads distinguish "never initialized" from "initialized but
/// empty"; the pages render different sentinels for the two.
#[derive(Debug, PartialEq, Eq)]
pub enum LogDump {
    NoTable,
    Rows(Vec<LogEntry>),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    NoTable,
    Cleared,
}

/// SQLite-backed record of messages the webhook has processed. Entries are
/// append-only and ordered by insertion; the only mutation is a bulk clear.
#[derive(Clone)]
pub struct LogStore {
    conn: Arc<Mutex<Connection>>,
}

impl LogStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        info!("User log store opened at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn table_exists(conn: &Connection) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type='table' AND name='user'",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Record one processed input. Creates the `user` table on first use.
    pub async fn append(&self, sender: &str, message: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user (
                sender TEXT NOT NULL,
                message TEXT NOT NULL
            )",
        )?;
        conn.execute(
            "INSERT INTO user (sender, message) VALUES (?1, ?2)",
            rusqlite::params![sender, message],
        )
        .context("Failed to append log entry")?;
        Ok(())
    }

    /// All entries in insertion order, or `NoTable` before the first append.
    pub async fn list_all(&self) -> Result<LogDump> {
        let conn = self.conn.lock().await;
        if !Self::table_exists(&conn)? {
            return Ok(LogDump::NoTable);
        }

        let mut stmt = conn.prepare("SELECT sender, message FROM user ORDER BY rowid ASC")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LogEntry {
                    sender: row.get(0)?,
                    message: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read log entries")?;

        Ok(LogDump::Rows(entries))
    }

    /// Delete every entry, keeping the table.
    pub async fn clear_all(&self) -> Result<ClearOutcome> {
        let conn = self.conn.lock().await;
        if !Self::table_exists(&conn)? {
            return Ok(ClearOutcome::NoTable);
        }

        conn.execute("DELETE FROM user", [])
            .context("Failed to clear log entries")?;
        Ok(ClearOutcome::Cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_store_has_no_table() {
        let store = LogStore::open_in_memory().unwrap();
        assert_eq!(store.list_all().await.unwrap(), LogDump::NoTable);
        assert_eq!(store.clear_all().await.unwrap(), ClearOutcome::NoTable);
    }

    #[tokio::test]
    async fn test_append_preserves_insertion_order() {
        let store = LogStore::open_in_memory().unwrap();
        store.append("42", "first").await.unwrap();
        store.append("43", "second").await.unwrap();

        let dump = store.list_all().await.unwrap();
        assert_eq!(
            dump,
            LogDump::Rows(vec![
                LogEntry {
                    sender: "42".to_string(),
                    message: "first".to_string(),
                },
                LogEntry {
                    sender: "43".to_string(),
                    message: "second".to_string(),
                },
            ])
        );
    }

    #[tokio::test]
    async fn test_clear_keeps_table_but_drops_rows() {
        let store = LogStore::open_in_memory().unwrap();
        store.append("42", "hello").await.unwrap();

        assert_eq!(store.clear_all().await.unwrap(), ClearOutcome::Cleared);
        // Cleared, not missing: the "no logs" sentinel, never an error.
        assert_eq!(store.list_all().await.unwrap(), LogDump::Rows(vec![]));
    }

    #[tokio::test]
    async fn test_duplicate_entries_are_kept() {
        let store = LogStore::open_in_memory().unwrap();
        store.append("42", "same").await.unwrap();
        store.append("42", "same").await.unwrap();

        match store.list_all().await.unwrap() {
            LogDump::Rows(rows) => assert_eq!(rows.len(), 2),
            LogDump::NoTable => panic!("table should exist after append"),
        }
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");

        {
            let store = LogStore::open(&path).unwrap();
            store.append("42", "persisted").await.unwrap();
        }

        let store = LogStore::open(&path).unwrap();
        match store.list_all().await.unwrap() {
            LogDump::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].message, "persisted");
            }
            LogDump::NoTable => panic!("table should persist across reopen"),
        }
    }
}
