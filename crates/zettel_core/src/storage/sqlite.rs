//! SQLite-backed storage over the migrated `kv_store` table.

use super::{validate_key, KeyValueStorage, StorageResult, WriteBatch, WriteOp};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;

/// Key-value storage in a single SQLite database.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens a database file, applying pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStorage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_store ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        for op in batch.ops() {
            validate_key(op.key())?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    tx.execute(
                        "INSERT INTO kv_store (key, value, updated_at)
                         VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                         ON CONFLICT(key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = excluded.updated_at;",
                        params![key, value],
                    )?;
                }
                WriteOp::Delete { key } => {
                    tx.execute("DELETE FROM kv_store WHERE key = ?1;", [key])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
