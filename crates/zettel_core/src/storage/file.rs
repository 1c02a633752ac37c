//! Directory-backed storage: one `<key>.json` file per key.
//!
//! Batch writes stage every value into a `.tmp` sibling first and only
//! rename once all staging succeeded. Each key's previous value is read just
//! before it is replaced; if a later key fails, the keys already committed
//! are written back and the leftover staging files removed.

use super::{validate_key, KeyValueStorage, StorageResult, WriteBatch, WriteOp};
use log::warn;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const VALUE_EXTENSION: &str = "json";
const STAGING_EXTENSION: &str = "json.tmp";

/// Storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Opens (and creates when missing) the storage directory.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{VALUE_EXTENSION}"))
    }

    fn staging_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{STAGING_EXTENSION}"))
    }

    fn discard_staged(&self, staged: &[&str]) {
        for key in staged {
            if let Err(err) = remove_if_present(&self.staging_path(key)) {
                warn!(
                    "event=storage_stage_cleanup module=storage status=error backend=file key={} error={}",
                    key, err
                );
            }
        }
    }

    /// Moves one op into place and returns the value it replaced.
    fn commit(&self, op: &WriteOp) -> StorageResult<Option<String>> {
        let previous = self.get(op.key())?;
        match op {
            WriteOp::Put { key, .. } => fs::rename(self.staging_path(key), self.value_path(key))?,
            WriteOp::Delete { key } => remove_if_present(&self.value_path(key))?,
        }
        Ok(previous)
    }

    /// Puts committed keys back to their previous values, newest first.
    fn roll_back(&self, committed: &[(&str, Option<String>)]) {
        for (key, previous) in committed.iter().rev() {
            let path = self.value_path(key);
            let restored = match previous {
                Some(value) => fs::write(&path, value),
                None => remove_if_present(&path),
            };
            match restored {
                Ok(()) => warn!(
                    "event=storage_rollback module=storage status=ok backend=file key={}",
                    key
                ),
                Err(err) => warn!(
                    "event=storage_rollback module=storage status=error backend=file key={} error={}",
                    key, err
                ),
            }
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl KeyValueStorage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.value_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        for op in batch.ops() {
            validate_key(op.key())?;
        }

        let mut staged = Vec::new();
        for op in batch.ops() {
            if let WriteOp::Put { key, value } = op {
                staged.push(key.as_str());
                if let Err(err) = fs::write(self.staging_path(key), value) {
                    self.discard_staged(&staged);
                    return Err(err.into());
                }
            }
        }

        let mut committed = Vec::new();
        for (index, op) in batch.ops().iter().enumerate() {
            match self.commit(op) {
                Ok(previous) => committed.push((op.key(), previous)),
                Err(err) => {
                    let pending = batch.ops()[index..]
                        .iter()
                        .filter(|op| matches!(op, WriteOp::Put { .. }))
                        .map(WriteOp::key)
                        .collect::<Vec<_>>();
                    self.discard_staged(&pending);
                    self.roll_back(&committed);
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FileStorage;
    use crate::storage::{KeyValueStorage, WriteBatch};
    use std::fs;

    #[test]
    fn values_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut storage = FileStorage::open(dir.path()).unwrap();
            storage.set("zetteltweet-notes", "[]".to_string()).unwrap();
        }
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(
            storage.get("zetteltweet-notes").unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(storage.keys().unwrap(), vec!["zetteltweet-notes".to_string()]);
    }

    #[test]
    fn missing_key_reads_as_none_and_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.get("absent").unwrap().is_none());
        storage.remove("absent").unwrap();
    }

    #[test]
    fn invalid_key_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        let result = storage.apply(WriteBatch::new().put("ok", "1").put("../escape", "2"));
        assert!(result.is_err());
        assert!(storage.get("ok").unwrap().is_none());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn failed_commit_restores_earlier_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        storage.set("zetteltweet-notes", "old".to_string()).unwrap();
        // A non-empty directory in place of the value file cannot be read or replaced.
        let blocked = dir.path().join("zetteltweet-threads.json");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), "x").unwrap();

        let result = storage.apply(
            WriteBatch::new()
                .put("zetteltweet-last-sync", "\"2024-01-01T00:00:00.000Z\"")
                .put("zetteltweet-notes", "new")
                .put("zetteltweet-threads", "[]"),
        );

        assert!(result.is_err());
        assert_eq!(storage.get("zetteltweet-notes").unwrap().as_deref(), Some("old"));
        assert!(storage.get("zetteltweet-last-sync").unwrap().is_none());
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect::<Vec<_>>();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
