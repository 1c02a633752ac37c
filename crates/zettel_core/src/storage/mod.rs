//! Pluggable key-value persistence backends.
//!
//! # Responsibility
//! - Define the minimal string key → string value contract the store needs.
//! - Provide memory, directory-of-files and SQLite implementations.
//!
//! # Invariants
//! - `apply` is all-or-nothing: on error every key in the batch holds its
//!   previous value. The file backend restores keys it already replaced.
//! - Reads of an absent key return `Ok(None)`, never an error.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod file;
mod memory;
mod sqlite;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Backend failure. Every variant means "storage unavailable" to callers.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Db(DbError),
    /// Write would grow stored data past the configured quota.
    QuotaExceeded { requested: usize, quota: usize },
    /// Backend refused the operation (invalid key, disabled medium, ...).
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded { requested, quota } => write!(
                f,
                "storage quota exceeded: {requested} bytes requested, {quota} bytes allowed"
            ),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One pending mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: String },
    Delete { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Ordered set of writes applied atomically by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// String key-value storage area.
pub trait KeyValueStorage {
    /// Short backend label used in log events.
    fn backend_name(&self) -> &'static str;
    /// Returns the raw stored value for `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Returns every stored key in ascending order.
    fn keys(&self) -> StorageResult<Vec<String>>;
    /// Applies all writes in `batch`, or none of them.
    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()>;

    fn set(&mut self, key: &str, value: String) -> StorageResult<()> {
        self.apply(WriteBatch::new().put(key, value))
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.apply(WriteBatch::new().delete(key))
    }
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        (**self).apply(batch)
    }
}

/// Sum of key and value lengths in bytes across all stored entries.
pub fn stored_bytes<S: KeyValueStorage + ?Sized>(storage: &S) -> StorageResult<usize> {
    let mut total = 0usize;
    for key in storage.keys()? {
        if let Some(value) = storage.get(&key)? {
            total = total.saturating_add(key.len() + value.len());
        }
    }
    Ok(total)
}

/// Rejects keys that cannot be mapped safely onto every backend.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Unavailable(format!(
            "unsupported storage key `{key}`"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{stored_bytes, validate_key, KeyValueStorage, MemoryStorage, WriteBatch};

    #[test]
    fn batch_builder_keeps_order() {
        let batch = WriteBatch::new().put("a", "1").delete("b");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].key(), "a");
        assert_eq!(batch.ops()[1].key(), "b");
    }

    #[test]
    fn key_validation_rejects_paths() {
        assert!(validate_key("zetteltweet-notes").is_ok());
        assert!(validate_key("__storage_test__").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn stored_bytes_sums_keys_and_values() {
        let mut storage = MemoryStorage::new();
        storage.set("ab", "1234".to_string()).unwrap();
        storage.set("c", "5".to_string()).unwrap();
        assert_eq!(stored_bytes(&storage).unwrap(), 8);
    }

    #[test]
    fn boxed_storage_delegates() {
        let mut storage: Box<dyn KeyValueStorage> = Box::new(MemoryStorage::new());
        storage.set("k", "v".to_string()).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert!(storage.get("k").unwrap().is_none());
        assert_eq!(storage.backend_name(), "memory");
    }
}
