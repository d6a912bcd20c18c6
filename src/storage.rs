//! Persisted key-value boundary
//!
//! State lives in memory; storage is best-effort. Effects produced by
//! [`TrainingState::apply`](crate::state::TrainingState::apply) are written
//! after each transition, and a failed write is logged and counted but never
//! rolls the in-memory state back.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::error::StorageError;
use crate::state::{PersistEffect, TrainingState};

/// String key-value store behind the engine
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store with a single `kv_store` table
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create or open a store at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable {
                    reason: format!("cannot create {}: {}", parent.display(), e),
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self { conn };
        store.init_schema()?;

        tracing::debug!(path = %path.display(), "Opened SQLite store");
        Ok(store)
    }

    /// Store that lives only as long as the connection
    pub fn in_memory() -> Result<Self, StorageError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(())
    }

    /// Number of stored keys
    pub fn key_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, CURRENT_TIMESTAMP)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
                "#,
                params![key, value],
            )
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(|e| StorageError::RemoveFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Outcome of running a batch of effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub applied: usize,
    pub failed: usize,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Applies persistence effects against a store
pub struct EffectExecutor;

impl EffectExecutor {
    /// Run every effect in order. Failures are logged and counted, never returned.
    pub fn execute<S: KeyValueStore + ?Sized>(store: &mut S, effects: &[PersistEffect]) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for effect in effects {
            let result = match effect {
                PersistEffect::Persist { key, value } => store.set(key.as_str(), value),
                PersistEffect::Remove { key } => store.remove(key.as_str()),
            };

            match result {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(key = %effect.key(), error = %e, "Persisting state failed; keeping in-memory state");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Load the full training state, falling back per key on missing or unreadable values
pub fn load_state<S: KeyValueStore + ?Sized>(store: &S) -> TrainingState {
    TrainingState::from_components(|key| match store.get(key.as_str()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Reading persisted state failed; using default");
            None
        }
    })
}
