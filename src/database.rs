use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{LottoError, LottoResult};

/// String-keyed blob persistence. Each `set` replaces the whole value.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> LottoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> LottoResult<()>;
}

pub fn create_database_with_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Open (creating if needed) the SQLite file and its parent directory.
pub fn open_database(path: &Path) -> LottoResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    create_database_with_connection(&conn)?;
    Ok(conn)
}

/// Blob store backed by the `kv_store` table.
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    pub fn new(conn: Connection) -> LottoResult<Self> {
        create_database_with_connection(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: &Path) -> LottoResult<Self> {
        Self::new(open_database(path)?)
    }

    fn lock(&self) -> LottoResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LottoError::Persistence("connection lock poisoned".to_string()))
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> LottoResult<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        let value = stmt
            .query_row([key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> LottoResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            (key, value),
        )?;
        Ok(())
    }
}

/// In-process blob store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> LottoResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| LottoError::Persistence("memory store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> LottoResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LottoResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_overwrites_values() {
        let store = SqliteBlobStore::new(Connection::open_in_memory().unwrap()).unwrap();
        assert_eq!(store.get("draws_json").unwrap(), None);

        store.set("draws_json", "{\"draws\":[]}").unwrap();
        store.set("draws_json", "{\"draws\":[1]}").unwrap();
        assert_eq!(
            store.get("draws_json").unwrap().as_deref(),
            Some("{\"draws\":[1]}")
        );
    }

    #[test]
    fn sqlite_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lotto.db");

        SqliteBlobStore::open(&path).unwrap().set("k", "v").unwrap();
        let reopened = SqliteBlobStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
    }
}
