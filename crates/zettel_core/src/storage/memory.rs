//! In-process storage backend with an optional byte quota.

use super::{validate_key, KeyValueStorage, StorageError, StorageResult, WriteBatch, WriteOp};
use std::collections::BTreeMap;

/// `BTreeMap`-backed storage. Contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits total `key.len() + value.len()` across entries, mimicking a
    /// browser storage quota.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn projected_size(&self, batch: &WriteBatch) -> usize {
        let mut staged = self
            .entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.len()))
            .collect::<BTreeMap<_, _>>();
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    staged.insert(key.as_str(), value.len());
                }
                WriteOp::Delete { key } => {
                    staged.remove(key.as_str());
                }
            }
        }
        staged
            .into_iter()
            .map(|(key, value_len)| key.len() + value_len)
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        for op in batch.ops() {
            validate_key(op.key())?;
        }
        if let Some(quota) = self.quota_bytes {
            let requested = self.projected_size(&batch);
            if requested > quota {
                return Err(StorageError::QuotaExceeded { requested, quota });
            }
        }

        for op in batch.ops {
            match op {
                WriteOp::Put { key, value } => {
                    self.entries.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    self.entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStorage;
    use crate::storage::{KeyValueStorage, StorageError, WriteBatch};

    #[test]
    fn quota_violation_rejects_whole_batch() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("a", "1".to_string()).unwrap();

        let err = storage
            .apply(WriteBatch::new().put("b", "2").put("c", "x".repeat(20)))
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
        assert!(storage.get("b").unwrap().is_none());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn deletes_free_quota_within_same_batch() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("a", "12345678".to_string()).unwrap();
        storage
            .apply(WriteBatch::new().delete("a").put("b", "12345678"))
            .unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn keys_are_sorted() {
        let mut storage = MemoryStorage::new();
        storage.set("b", String::new()).unwrap();
        storage.set("a", String::new()).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
