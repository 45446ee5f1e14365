//! SQLite-based store implementation

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{ConditionalWrite, Store, StoreError, StoreResult, Versioned, ABSENT_VERSION};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Key/value documents
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                version INTEGER NOT NULL
            );

            -- Store-wide version counter (single row)
            CREATE TABLE IF NOT EXISTS kv_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_version INTEGER NOT NULL
            );

            INSERT OR IGNORE INTO kv_meta (id, last_version) VALUES (1, 0);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn next_version(tx: &Transaction<'_>) -> StoreResult<u64> {
    let version: i64 = tx.query_row(
        "UPDATE kv_meta SET last_version = last_version + 1 WHERE id = 1 RETURNING last_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version as u64)
}

fn current_version(tx: &Transaction<'_>, key: &str) -> StoreResult<u64> {
    let version: Option<i64> = tx
        .query_row("SELECT version FROM kv WHERE key = ?", [key], |row| row.get(0))
        .optional()?;
    Ok(version.map(|v| v as u64).unwrap_or(ABSENT_VERSION))
}

fn upsert(tx: &Transaction<'_>, key: &str, value: &str) -> StoreResult<u64> {
    let version = next_version(tx)?;
    tx.execute(
        r#"
        INSERT INTO kv (key, value, version)
        VALUES (?, ?, ?)
        ON CONFLICT(key)
        DO UPDATE SET value = excluded.value, version = excluded.version
        "#,
        params![key, value, version as i64],
    )?;
    Ok(version)
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let conn = self.lock()?;

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, version FROM kv WHERE key = ?",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(value, version)| Versioned {
            value,
            version: version as u64,
        }))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let version = upsert(&tx, key, value)?;
        tx.commit()?;

        debug!(key, version, "Value stored");
        Ok(version)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        debug!(key, "Value removed");
        Ok(())
    }

    fn commit(&self, writes: &[ConditionalWrite]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for write in writes {
            let current = current_version(&tx, &write.key)?;
            if current != write.expected_version {
                debug!(
                    key = %write.key,
                    expected = write.expected_version,
                    current,
                    "Conditional commit rejected"
                );
                // Dropping the transaction rolls back anything already written
                return Err(StoreError::VersionConflict(write.key.clone()));
            }
        }

        for write in writes {
            upsert(&tx, &write.key, &write.value)?;
        }

        tx.commit()?;
        debug!(keys = writes.len(), "Conditional commit applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_get_remove() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.get("missing").unwrap().is_none());

        let v1 = store.set("k", "one").unwrap();
        let got = store.get("k").unwrap().unwrap();
        assert_eq!(got.value, "one");
        assert_eq!(got.version, v1);

        let v2 = store.set("k", "two").unwrap();
        assert!(v2 > v1);
        assert_eq!(store.get_value("k").unwrap().as_deref(), Some("two"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        store.remove("k").unwrap();
    }

    #[test]
    fn test_versions_never_reused_after_remove() {
        let store = SqliteStore::in_memory().unwrap();
        let v1 = store.set("k", "a").unwrap();
        store.remove("k").unwrap();
        let v2 = store.set("k", "a").unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_commit_applies_all_writes() {
        let store = SqliteStore::in_memory().unwrap();
        let inv = store.set("inventory", "[]").unwrap();

        store
            .commit(&[
                ConditionalWrite::new("inventory", inv, "[1]"),
                ConditionalWrite::new("orders", ABSENT_VERSION, "[2]"),
            ])
            .unwrap();

        assert_eq!(store.get_value("inventory").unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.get_value("orders").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_commit_conflict_leaves_store_untouched() {
        let store = SqliteStore::in_memory().unwrap();
        let stale = store.set("inventory", "[]").unwrap();
        store.set("inventory", "[\"other writer\"]").unwrap();

        let result = store.commit(&[
            ConditionalWrite::new("orders", ABSENT_VERSION, "[1]"),
            ConditionalWrite::new("inventory", stale, "[2]"),
        ]);

        assert!(matches!(result, Err(StoreError::VersionConflict(ref k)) if k == "inventory"));
        assert!(store.get("orders").unwrap().is_none());
        assert_eq!(
            store.get_value("inventory").unwrap().as_deref(),
            Some("[\"other writer\"]")
        );
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", "persisted").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_value("k").unwrap().as_deref(), Some("persisted"));
        // Counter survives too
        let before = store.get("k").unwrap().unwrap().version;
        assert!(store.set("k2", "x").unwrap() > before);
    }
}
