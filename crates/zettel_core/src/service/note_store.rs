//! Note/thread store facade.
//!
//! # Responsibility
//! - Expose read queries and write operations over the persisted collections.
//! - Issue ids and strictly increasing timestamps for new records.
//! - Handle seeding, export/import and storage diagnostics.
//!
//! # Invariants
//! - Reads never fail: unreadable storage behaves like empty collections.
//! - Writes compute the complete new collections before one batch write, so
//!   a failed write leaves persisted state unchanged.
//! - Every write refreshes the last-sync record.

use crate::clock::{Clock, SystemClock};
use crate::model::backup::Backup;
use crate::model::collections::{Collections, TagCount, TagLink, ThreadChange};
use crate::model::note::{Note, NotePatch};
use crate::model::thread::Thread;
use crate::model::timestamp::{truncate_to_millis, Timestamp};
use crate::repo::collection_repo::CollectionRepository;
use crate::search::text::{filter_notes, TextQuery};
use crate::service::error::{StoreError, StoreResult};
use crate::service::seed::default_collections;
use crate::storage::{stored_bytes, KeyValueStorage};
use chrono::TimeDelta;
use log::{error, info};
use std::time::Instant;

/// Nominal capacity reported by `storage_usage`, matching a browser quota.
pub const STORAGE_QUOTA_KB: f64 = 5.0 * 1024.0;
const AVAILABILITY_CHECK_KEY: &str = "__storage_test__";

/// Approximate storage consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    pub used_kb: f64,
    pub total_kb: f64,
    pub percentage: f64,
}

/// Whether `initialize` wrote seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Seeded,
    AlreadyInitialized,
}

/// Note store over a pluggable key-value backend.
pub struct NoteStore<S: KeyValueStorage, C: Clock = SystemClock> {
    repo: CollectionRepository<S>,
    clock: C,
    last_issued: Option<Timestamp>,
}

impl<S: KeyValueStorage> NoteStore<S> {
    /// Creates a store using wall-clock time.
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: KeyValueStorage, C: Clock> NoteStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            repo: CollectionRepository::new(storage),
            clock,
            last_issued: None,
        }
    }

    pub fn storage(&self) -> &S {
        self.repo.storage()
    }

    pub fn into_storage(self) -> S {
        self.repo.into_storage()
    }

    /// Snapshot of both collections as currently persisted.
    pub fn collections(&self) -> Collections {
        self.repo.load()
    }

    // ---- reads -----------------------------------------------------------

    pub fn list_notes(&self) -> Vec<Note> {
        self.repo.load().notes_newest_first()
    }

    pub fn get_note(&self, id: &str) -> Option<Note> {
        self.repo.load().note(id).cloned()
    }

    pub fn list_notes_by_tag(&self, tag: &str) -> Vec<Note> {
        self.repo.load().notes_by_tag(tag)
    }

    pub fn list_threads(&self) -> Vec<Thread> {
        self.repo.load().threads_recent_first()
    }

    pub fn get_thread(&self, id: &str) -> Option<Thread> {
        self.repo.load().thread(id).cloned()
    }

    pub fn list_thread_notes(&self, thread_id: &str) -> Vec<Note> {
        self.repo.load().thread_notes(thread_id)
    }

    pub fn list_replies(&self, note_id: &str) -> Vec<Note> {
        self.repo.load().replies(note_id)
    }

    pub fn is_part_of_thread(&self, note_id: &str) -> bool {
        self.repo.load().is_part_of_thread(note_id)
    }

    pub fn list_thread_starters(&self) -> Vec<Note> {
        self.repo.load().thread_starters()
    }

    pub fn list_tags(&self) -> Vec<TagCount> {
        self.repo.load().tag_counts()
    }

    /// Note pairs connected through shared tags.
    pub fn list_connections(&self) -> Vec<TagLink> {
        self.repo.load().tag_links()
    }

    /// Case-insensitive substring search over content and tags.
    ///
    /// Results follow `list_notes` order; a blank query returns nothing.
    pub fn search_notes(&self, query: &str, limit: Option<usize>) -> Vec<Note> {
        match TextQuery::new(query, limit) {
            Some(query) => filter_notes(self.list_notes(), &query),
            None => Vec::new(),
        }
    }

    pub fn last_sync(&self) -> Option<Timestamp> {
        self.repo.last_sync()
    }

    /// Used/total kilobytes across every stored key.
    pub fn storage_usage(&self) -> StorageUsage {
        let used_bytes = stored_bytes(self.repo.storage()).unwrap_or_else(|err| {
            error!(
                "event=storage_usage module=store status=error backend={} error={}",
                self.repo.storage().backend_name(),
                err
            );
            0
        });
        let used_kb = used_bytes as f64 / 1024.0;
        StorageUsage {
            used_kb,
            total_kb: STORAGE_QUOTA_KB,
            percentage: used_kb / STORAGE_QUOTA_KB * 100.0,
        }
    }

    /// Checks the backend with a throwaway write and delete.
    pub fn is_storage_available(&mut self) -> bool {
        let storage = self.repo.storage_mut();
        let check = storage
            .set(AVAILABILITY_CHECK_KEY, AVAILABILITY_CHECK_KEY.to_string())
            .and_then(|()| storage.remove(AVAILABILITY_CHECK_KEY));
        match check {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=storage_check module=store status=error backend={} error={}",
                    storage.backend_name(),
                    err
                );
                false
            }
        }
    }

    // ---- writes ----------------------------------------------------------

    pub fn create_note(&mut self, content: impl Into<String>, tags: Vec<String>) -> StoreResult<Note> {
        let started_at = Instant::now();
        let content = content.into();
        self.write("note_create", started_at, |collections, now| {
            Ok(collections.create_note(Note::generate_id(), content, tags, now))
        })
        .inspect(|note| {
            info!(
                "event=note_create module=store status=ok note_id={} tag_count={} duration_ms={}",
                note.id,
                note.tags.len(),
                started_at.elapsed().as_millis()
            );
        })
    }

    pub fn start_thread(&mut self, content: impl Into<String>, tags: Vec<String>) -> StoreResult<Note> {
        let started_at = Instant::now();
        let content = content.into();
        self.write("thread_start", started_at, |collections, now| {
            Ok(collections.start_thread(
                Note::generate_id(),
                Thread::generate_id(),
                content,
                tags,
                now,
            ))
        })
        .inspect(|note| {
            info!(
                "event=thread_start module=store status=ok note_id={} thread_id={} duration_ms={}",
                note.id,
                note.thread_id().unwrap_or_default(),
                started_at.elapsed().as_millis()
            );
        })
    }

    pub fn reply_to_note(
        &mut self,
        parent_id: &str,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> StoreResult<Note> {
        let started_at = Instant::now();
        let content = content.into();
        self.write("note_reply", started_at, |collections, now| {
            collections
                .reply_to_note(
                    parent_id,
                    Note::generate_id(),
                    Thread::generate_id(),
                    content,
                    tags,
                    now,
                )
                .map_err(Into::into)
        })
        .inspect(|note| {
            info!(
                "event=note_reply module=store status=ok note_id={} parent_id={} thread_id={} position={} duration_ms={}",
                note.id,
                parent_id,
                note.thread_id().unwrap_or_default(),
                note.sort_position(),
                started_at.elapsed().as_millis()
            );
        })
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> StoreResult<Note> {
        let started_at = Instant::now();
        self.write("note_update", started_at, |collections, now| {
            collections.update_note(id, patch, now).map_err(Into::into)
        })
        .inspect(|note| {
            info!(
                "event=note_update module=store status=ok note_id={} duration_ms={}",
                note.id,
                started_at.elapsed().as_millis()
            );
        })
    }

    pub fn delete_note(&mut self, id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let outcome = self.write("note_delete", started_at, |collections, now| {
            collections.delete_note(id, now).map_err(Into::into)
        })?;

        let thread_effect = match &outcome.thread {
            ThreadChange::Unchanged => "none",
            ThreadChange::Decremented(_) => "decremented",
            ThreadChange::Removed(_) => "removed",
        };
        info!(
            "event=note_delete module=store status=ok note_id={} thread_effect={} duration_ms={}",
            outcome.note.id,
            thread_effect,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Seeds default data when no notes record exists yet.
    pub fn initialize(&mut self) -> StoreResult<InitOutcome> {
        if self.repo.has_notes_record()? {
            return Ok(InitOutcome::AlreadyInitialized);
        }
        let now = self.next_timestamp();
        let seed = default_collections();
        self.repo.save(&seed, now)?;
        info!(
            "event=store_seed module=store status=ok backend={} note_count={} thread_count={}",
            self.repo.storage().backend_name(),
            seed.notes.len(),
            seed.threads.len()
        );
        Ok(InitOutcome::Seeded)
    }

    /// Removes notes, threads and the last-sync record.
    pub fn clear_data(&mut self) -> StoreResult<()> {
        self.repo.clear()?;
        info!(
            "event=store_clear module=store status=ok backend={}",
            self.repo.storage().backend_name()
        );
        Ok(())
    }

    // ---- export / import -------------------------------------------------

    pub fn export_data(&self) -> Backup {
        let collections = self.repo.load();
        Backup {
            notes: collections.notes_newest_first(),
            threads: collections.threads_recent_first(),
            last_sync: self.repo.last_sync(),
        }
    }

    /// Pretty-printed export document.
    pub fn export_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&self.export_data())
            .map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    /// Replaces all persisted records with `backup`, without merging.
    pub fn import_data(&mut self, backup: Backup) -> StoreResult<()> {
        let (collections, last_sync) = backup.into_collections();
        let synced_at = match last_sync {
            Some(value) => value,
            None => self.next_timestamp(),
        };
        if let Err(err) = self.repo.save(&collections, synced_at) {
            let err = StoreError::from(err);
            error!(
                "event=store_import module=store status=error error_code={} error={}",
                err.code(),
                err
            );
            return Err(err);
        }
        info!(
            "event=store_import module=store status=ok note_count={} thread_count={}",
            collections.notes.len(),
            collections.threads.len()
        );
        Ok(())
    }

    /// Parses an export document and imports it. Parse failures write nothing.
    pub fn import_json(&mut self, document: &str) -> StoreResult<()> {
        let backup = serde_json::from_str::<Backup>(document).map_err(|err| {
            error!(
                "event=store_import module=store status=error error_code=corrupt error={}",
                err
            );
            StoreError::Corrupt(err.to_string())
        })?;
        self.import_data(backup)
    }

    // ---- internals -------------------------------------------------------

    /// Loads, mutates a copy, and persists it in one batch.
    fn write<T>(
        &mut self,
        event: &'static str,
        started_at: Instant,
        mutate: impl FnOnce(&mut Collections, Timestamp) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let result = self
            .repo
            .load_for_write()
            .map_err(StoreError::from)
            .and_then(|mut collections| {
                let now = self.next_timestamp();
                let value = mutate(&mut collections, now)?;
                self.repo.save(&collections, now)?;
                Ok(value)
            });

        if let Err(err) = &result {
            error!(
                "event={} module=store status=error backend={} duration_ms={} error_code={} error={}",
                event,
                self.repo.storage().backend_name(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
        }
        result
    }

    /// Clock time at millisecond precision, forced strictly past the last
    /// value this store handed out.
    fn next_timestamp(&mut self) -> Timestamp {
        let now = truncate_to_millis(self.clock.now());
        let issued = match self.last_issued {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_issued = Some(issued);
        issued
    }
}

#[cfg(test)]
mod tests {
    use super::{InitOutcome, NoteStore};
    use crate::clock::FixedClock;
    use crate::model::note::NotePatch;
    use crate::service::error::StoreError;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn frozen_store() -> NoteStore<MemoryStorage, FixedClock> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        NoteStore::with_clock(MemoryStorage::new(), FixedClock::new(start))
    }

    #[test]
    fn frozen_clock_still_yields_strictly_increasing_created_at() {
        let mut store = frozen_store();
        let first = store.create_note("a", vec![]).unwrap();
        let second = store.create_note("b", vec![]).unwrap();
        assert!(second.created_at > first.created_at);
        assert_eq!(store.list_notes()[0].id, second.id);
    }

    #[test]
    fn initialize_seeds_once() {
        let mut store = frozen_store();
        assert_eq!(store.initialize().unwrap(), InitOutcome::Seeded);
        assert_eq!(store.initialize().unwrap(), InitOutcome::AlreadyInitialized);
        assert_eq!(store.list_notes().len(), 9);
        assert!(store.last_sync().is_some());
    }

    #[test]
    fn update_with_empty_patch_still_touches_thread() {
        let mut store = frozen_store();
        let starter = store.start_thread("topic", vec![]).unwrap();
        let thread_id = starter.thread_id().unwrap().to_string();
        let before = store.get_thread(&thread_id).unwrap().updated_at;

        store.update_note(&starter.id, NotePatch::default()).unwrap();
        assert!(store.get_thread(&thread_id).unwrap().updated_at > before);
    }

    #[test]
    fn missing_note_errors_are_typed() {
        let mut store = frozen_store();
        assert!(matches!(
            store.delete_note("ghost"),
            Err(StoreError::NotFound { entity: "note", .. })
        ));
        assert!(matches!(
            store.reply_to_note("ghost", "x", vec![]),
            Err(StoreError::NotFound {
                entity: "parent note",
                ..
            })
        ));
    }

    #[test]
    fn availability_check_leaves_no_trace() {
        let mut store = frozen_store();
        assert!(store.is_storage_available());
        assert!(store.storage().is_empty());
    }

    #[test]
    fn usage_reports_nominal_quota() {
        let mut store = frozen_store();
        store.initialize().unwrap();
        let usage = store.storage_usage();
        assert_eq!(usage.total_kb, 5120.0);
        assert!(usage.used_kb > 0.0);
        assert!(usage.percentage > 0.0 && usage.percentage < 100.0);
    }
}
