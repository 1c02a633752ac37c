//! Persisted record layout for notes, threads and the last-sync marker.
//!
//! # Responsibility
//! - Map the collection pair onto three JSON records in a key-value store.
//! - Degrade unreadable or malformed records to empty collections.
//!
//! # Invariants
//! - Every save writes all three records in one batch.
//! - Reads never fail; problems are logged and yield empty data.
//! - A record that parses as a JSON array is decoded element by element;
//!   only elements that do not fit the schema are dropped.

use crate::model::collections::Collections;
use crate::model::note::Note;
use crate::model::thread::Thread;
use crate::model::timestamp::{format_iso8601, parse_iso8601, Timestamp};
use crate::storage::{KeyValueStorage, StorageError, WriteBatch};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the notes array.
pub const NOTES_KEY: &str = "zetteltweet-notes";
/// Storage key of the threads array.
pub const THREADS_KEY: &str = "zetteltweet-threads";
/// Storage key of the JSON-encoded last write timestamp.
pub const LAST_SYNC_KEY: &str = "zetteltweet-last-sync";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Backend rejected a read or write.
    Storage(StorageError),
    /// A record could not be encoded to JSON.
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode record: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// JSON record mapper over a key-value backend.
pub struct CollectionRepository<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> CollectionRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Loads both collections for read paths. Never fails.
    pub fn load(&self) -> Collections {
        Collections::new(
            self.decode_list(NOTES_KEY, self.read_logged(NOTES_KEY)),
            self.decode_list(THREADS_KEY, self.read_logged(THREADS_KEY)),
        )
    }

    /// Loads both collections for write paths.
    ///
    /// Backend failures propagate so a write never clobbers data it could not
    /// read; malformed JSON still degrades to empty collections.
    pub fn load_for_write(&self) -> RepoResult<Collections> {
        Ok(Collections::new(
            self.decode_list(NOTES_KEY, self.storage.get(NOTES_KEY)?),
            self.decode_list(THREADS_KEY, self.storage.get(THREADS_KEY)?),
        ))
    }

    /// Whether the notes record exists at all (even if empty or malformed).
    pub fn has_notes_record(&self) -> RepoResult<bool> {
        Ok(self.storage.get(NOTES_KEY)?.is_some())
    }

    pub fn last_sync(&self) -> Option<Timestamp> {
        let raw = self.read_or_default::<Option<String>>(LAST_SYNC_KEY)?;
        let parsed = parse_iso8601(&raw);
        if parsed.is_none() {
            warn!(
                "event=record_decode module=repo status=error key={} error=invalid_timestamp",
                LAST_SYNC_KEY
            );
        }
        parsed
    }

    /// Writes notes, threads and the last-sync marker as one batch.
    pub fn save(&mut self, collections: &Collections, synced_at: Timestamp) -> RepoResult<()> {
        let batch = WriteBatch::new()
            .put(NOTES_KEY, serde_json::to_string(&collections.notes)?)
            .put(THREADS_KEY, serde_json::to_string(&collections.threads)?)
            .put(
                LAST_SYNC_KEY,
                serde_json::to_string(&format_iso8601(&synced_at))?,
            );
        self.storage.apply(batch)?;
        Ok(())
    }

    /// Removes all three records.
    pub fn clear(&mut self) -> RepoResult<()> {
        let batch = WriteBatch::new()
            .delete(NOTES_KEY)
            .delete(THREADS_KEY)
            .delete(LAST_SYNC_KEY);
        self.storage.apply(batch)?;
        Ok(())
    }

    fn read_logged(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=record_read module=repo status=error backend={} key={} error={}",
                    self.storage.backend_name(),
                    key,
                    err
                );
                None
            }
        }
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.decode_or_default(key, self.read_logged(key))
    }

    fn decode_list<T: DeserializeOwned>(&self, key: &str, raw: Option<String>) -> Vec<T> {
        self.decode_or_default::<Vec<Value>>(key, raw)
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| match serde_json::from_value(element) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(
                        "event=record_decode module=repo status=error key={} index={} error={}",
                        key, index, err
                    );
                    None
                }
            })
            .collect()
    }

    fn decode_or_default<T: DeserializeOwned + Default>(&self, key: &str, raw: Option<String>) -> T {
        let Some(raw) = raw else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(
                "event=record_decode module=repo status=error key={} error={}",
                key, err
            );
            T::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionRepository, LAST_SYNC_KEY, NOTES_KEY, THREADS_KEY};
    use crate::model::backup::APP_NAME;
    use crate::model::collections::Collections;
    use crate::model::note::Note;
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use chrono::{TimeZone, Utc};

    #[test]
    fn keys_share_the_app_prefix() {
        for key in [NOTES_KEY, THREADS_KEY, LAST_SYNC_KEY] {
            assert!(key.starts_with(APP_NAME));
        }
    }

    #[test]
    fn save_then_load_preserves_collections() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut repo = CollectionRepository::new(MemoryStorage::new());
        let collections = Collections::new(vec![Note::new("a", "x", vec![], now)], vec![]);

        repo.save(&collections, now).unwrap();
        assert_eq!(repo.load(), collections);
        assert_eq!(repo.last_sync(), Some(now));
        assert_eq!(
            repo.storage().get(LAST_SYNC_KEY).unwrap().as_deref(),
            Some("\"2024-01-02T03:04:05.000Z\"")
        );
    }

    #[test]
    fn malformed_records_read_as_empty() {
        let mut storage = MemoryStorage::new();
        storage.set(NOTES_KEY, "{not json".to_string()).unwrap();
        storage.set(LAST_SYNC_KEY, "\"not a date\"".to_string()).unwrap();
        let repo = CollectionRepository::new(storage);

        assert!(repo.load().notes.is_empty());
        assert!(repo.load_for_write().unwrap().notes.is_empty());
        assert!(repo.has_notes_record().unwrap());
        assert!(repo.last_sync().is_none());
    }

    #[test]
    fn off_schema_elements_are_dropped_individually() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                NOTES_KEY,
                r#"[
                    {"id":"kept","content":"a","createdAt":"2023-05-16T10:30:00","tags":[]},
                    {"id":"dropped","content":"b","createdAt":"2023-05-16T10:30:00.000Z","tags":[],"position":"first"}
                ]"#
                .to_string(),
            )
            .unwrap();
        storage
            .set(
                THREADS_KEY,
                r#"[{"id":"t","noteCount":-1,"createdAt":"2023-05-16","updatedAt":"2023-05-16"}]"#
                    .to_string(),
            )
            .unwrap();
        let repo = CollectionRepository::new(storage);

        let loaded = repo.load_for_write().unwrap();
        let ids = loaded.notes.iter().map(|note| note.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["kept"]);
        assert!(loaded.threads.is_empty());
        assert_eq!(repo.load(), loaded);
    }

    #[test]
    fn clear_removes_all_records() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut repo = CollectionRepository::new(MemoryStorage::new());
        repo.save(&Collections::default(), now).unwrap();
        repo.clear().unwrap();
        assert!(repo.storage().keys().unwrap().is_empty());
        assert!(!repo.has_notes_record().unwrap());
    }
}
