use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable string storage addressed by key, the local equivalent of a
/// browser's `localStorage`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("kv store lock poisoned: {error}")))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("kv store lock poisoned: {error}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
