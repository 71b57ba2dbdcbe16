//! Database module - local key-value storage
//!
//! String keys, string values. Progress records, the remembered body-part
//! selection and the persisted session credential all share one namespace.

mod memory;

pub use memory::MemoryStore;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;

/// Persistent string-keyed string-value store
///
/// No transactions: every call stands alone and is durable once it returns.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys in ascending order
    fn all_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Values for `keys`, in request order; absent keys map to `None`
    fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, StoreError> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.get(key)?)))
            .collect()
    }

    fn clear(&self) -> Result<(), StoreError>;
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create store
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, StoreError> {
        let mut stmt = self.conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = stmt.query_row(params![key], |row| row.get(0)).optional()?;
            values.push((key.clone(), value));
        }
        Ok(values)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv", [])?;
        Ok(())
    }
}
