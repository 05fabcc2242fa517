use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Storage key for the conversation collection blob.
pub const HISTORY_KEY: &str = "sarah-chat-history";

/// Storage key for the corpus collection blob.
pub const CORPUS_KEY: &str = "educational-ai-corpus";

/// Keyed JSON blobs in SQLite — the durable-storage analog of the browser
/// profile the chat history and corpus previously lived in. Each key holds
/// one full JSON array, rewritten on every mutation.
pub struct BlobStore {
    conn: Mutex<Connection>,
}

impl BlobStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS storage (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;

        info!("Storage opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("storage lock poisoned: {}", e))?;
        let result = conn.query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
            row.get(0)
        });
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("storage lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_and_get_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::open(&dir.path().join("sarah.db")).expect("open");

        assert_eq!(store.get("k").expect("get"), None);
        store.put("k", "[1]").expect("put");
        store.put("k", "[1,2]").expect("put");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("[1,2]"));
    }
}
