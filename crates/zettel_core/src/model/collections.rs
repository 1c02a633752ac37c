//! In-memory note/thread collection pair and its pure operations.
//!
//! # Responsibility
//! - Answer every derived view (by tag, by thread, replies, starters).
//! - Apply write operations while keeping thread metadata consistent.
//!
//! # Invariants
//! - New notes are prepended, so collection order is newest-insert first.
//! - Mutations either fully apply or leave `self` untouched.
//! - Ids and timestamps are supplied by the caller; nothing here reads a clock.

use crate::model::note::{Note, NoteId, NotePatch};
use crate::model::thread::{Thread, ThreadId};
use crate::model::timestamp::Timestamp;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Semantic failure of a collection mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Reply target does not exist.
    ParentNotFound(NoteId),
    /// Delete blocked because other notes reply to this one.
    HasReplies { note_id: NoteId, reply_count: usize },
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent note not found: {id}"),
            Self::HasReplies {
                note_id,
                reply_count,
            } => write!(
                f,
                "cannot delete note {note_id}: it has {reply_count} repl{}",
                if *reply_count == 1 { "y" } else { "ies" }
            ),
        }
    }
}

impl Error for CollectionError {}

/// Tag usage summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub note_count: usize,
}

/// Two notes connected by at least one shared tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLink {
    /// The newer note of the pair.
    pub source: NoteId,
    pub target: NoteId,
    /// Tags both notes carry, in `source` tag order.
    pub shared_tags: Vec<String>,
}

/// What happened to the owning thread when a note was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadChange {
    /// Note was not threaded, or its thread record was already missing.
    Unchanged,
    /// Thread survives with the updated metadata.
    Decremented(Thread),
    /// Last member was removed and the thread record dropped.
    Removed(ThreadId),
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub note: Note,
    pub thread: ThreadChange,
}

/// The two denormalized collections persisted by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub notes: Vec<Note>,
    pub threads: Vec<Thread>,
}

impl Collections {
    pub fn new(notes: Vec<Note>, threads: Vec<Thread>) -> Self {
        Self { notes, threads }
    }

    /// All notes, newest `created_at` first. Ties keep collection order.
    pub fn notes_newest_first(&self) -> Vec<Note> {
        let mut notes = self.notes.clone();
        sort_newest_first(&mut notes);
        notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn notes_by_tag(&self, tag: &str) -> Vec<Note> {
        let mut notes = self
            .notes
            .iter()
            .filter(|note| note.has_tag(tag))
            .cloned()
            .collect::<Vec<_>>();
        sort_newest_first(&mut notes);
        notes
    }

    /// All threads, most recently updated first.
    pub fn threads_recent_first(&self) -> Vec<Thread> {
        let mut threads = self.threads.clone();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        threads
    }

    pub fn thread(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.id == id)
    }

    /// Members of one thread in position order.
    pub fn thread_notes(&self, thread_id: &str) -> Vec<Note> {
        self.ordered_by_position(|note| note.belongs_to(thread_id))
    }

    /// Direct replies to one note in position order.
    pub fn replies(&self, note_id: &str) -> Vec<Note> {
        self.ordered_by_position(|note| note.is_reply_to(note_id))
    }

    pub fn reply_count(&self, note_id: &str) -> usize {
        self.notes
            .iter()
            .filter(|note| note.is_reply_to(note_id))
            .count()
    }

    pub fn is_part_of_thread(&self, note_id: &str) -> bool {
        self.note(note_id).is_some_and(Note::is_threaded)
    }

    /// Position-0 notes of every thread, newest first.
    pub fn thread_starters(&self) -> Vec<Note> {
        let mut notes = self
            .notes
            .iter()
            .filter(|note| note.is_thread_starter())
            .cloned()
            .collect::<Vec<_>>();
        sort_newest_first(&mut notes);
        notes
    }

    /// Number of notes currently carrying `thread_id`.
    pub fn thread_member_count(&self, thread_id: &str) -> usize {
        self.notes
            .iter()
            .filter(|note| note.belongs_to(thread_id))
            .count()
    }

    /// Distinct tags with how many notes use them, sorted by tag.
    ///
    /// A tag repeated within one note counts once for that note.
    pub fn tag_counts(&self) -> Vec<TagCount> {
        let mut counts = BTreeMap::<&str, usize>::new();
        for note in &self.notes {
            let distinct = note.tags.iter().map(String::as_str).collect::<BTreeSet<_>>();
            for tag in distinct {
                *counts.entry(tag).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .map(|(tag, note_count)| TagCount {
                tag: tag.to_string(),
                note_count,
            })
            .collect()
    }

    /// Every pair of notes sharing a tag, walked in `notes_newest_first` order.
    ///
    /// Tag matching is exact. Notes without shared tags appear in no link.
    pub fn tag_links(&self) -> Vec<TagLink> {
        let notes = self.notes_newest_first();
        let mut links = Vec::new();
        for (index, source) in notes.iter().enumerate() {
            for target in &notes[index + 1..] {
                let mut shared_tags = Vec::<String>::new();
                for tag in &source.tags {
                    if target.has_tag(tag) && !shared_tags.contains(tag) {
                        shared_tags.push(tag.clone());
                    }
                }
                if !shared_tags.is_empty() {
                    links.push(TagLink {
                        source: source.id.clone(),
                        target: target.id.clone(),
                        shared_tags,
                    });
                }
            }
        }
        links
    }

    /// Thread ids whose `note_count` disagrees with live membership.
    pub fn inconsistent_threads(&self) -> Vec<ThreadId> {
        self.threads
            .iter()
            .filter(|thread| thread.note_count as usize != self.thread_member_count(&thread.id))
            .map(|thread| thread.id.clone())
            .collect()
    }

    /// Prepends a standalone note.
    pub fn create_note(
        &mut self,
        id: NoteId,
        content: String,
        tags: Vec<String>,
        now: Timestamp,
    ) -> Note {
        let note = Note::new(id, content, tags, now);
        self.notes.insert(0, note.clone());
        note
    }

    /// Prepends a note as position 0 of a brand-new thread.
    pub fn start_thread(
        &mut self,
        note_id: NoteId,
        thread_id: ThreadId,
        content: String,
        tags: Vec<String>,
        now: Timestamp,
    ) -> Note {
        let thread = Thread::new(thread_id.clone(), &content, 1, now);
        let mut note = Note::new(note_id, content, tags, now);
        note.thread_id = Some(thread_id);
        note.position = Some(0);

        self.notes.insert(0, note.clone());
        self.threads.insert(0, thread);
        note
    }

    /// Appends a reply to `parent_id`, creating the thread when needed.
    ///
    /// `new_thread_id` is only consumed when the parent is not yet threaded.
    /// An unthreaded parent is adopted as the starter (`position = 0`) before
    /// the reply position is computed, so its first reply lands at 1. A thread
    /// record created here takes its title from the reply.
    pub fn reply_to_note(
        &mut self,
        parent_id: &str,
        note_id: NoteId,
        new_thread_id: ThreadId,
        content: String,
        tags: Vec<String>,
        now: Timestamp,
    ) -> Result<Note, CollectionError> {
        let parent_index = self
            .notes
            .iter()
            .position(|note| note.id == parent_id)
            .ok_or_else(|| CollectionError::ParentNotFound(parent_id.to_string()))?;

        let existing_thread = self.notes[parent_index].thread_id().map(str::to_string);
        let thread_id = match existing_thread {
            Some(existing) => existing,
            None => {
                let parent = &mut self.notes[parent_index];
                parent.thread_id = Some(new_thread_id.clone());
                parent.position = Some(0);
                new_thread_id
            }
        };

        let position = u32::try_from(self.thread_member_count(&thread_id)).unwrap_or(u32::MAX);
        let mut note = Note::new(note_id, content, tags, now);
        note.thread_id = Some(thread_id.clone());
        note.parent_id = Some(parent_id.to_string());
        note.position = Some(position);
        self.notes.insert(0, note.clone());

        let member_count = u32::try_from(self.thread_member_count(&thread_id)).unwrap_or(u32::MAX);
        match self.threads.iter_mut().find(|thread| thread.id == thread_id) {
            Some(thread) => {
                thread.note_count = thread.note_count.saturating_add(1);
                thread.touch(now);
            }
            None => {
                self.threads
                    .insert(0, Thread::new(thread_id, &note.content, member_count, now));
            }
        }

        Ok(note)
    }

    /// Merges `patch` into an existing note and touches its thread.
    pub fn update_note(
        &mut self,
        id: &str,
        patch: NotePatch,
        now: Timestamp,
    ) -> Result<Note, CollectionError> {
        let note = self
            .notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or_else(|| CollectionError::NoteNotFound(id.to_string()))?;
        patch.apply_to(note);
        let updated = note.clone();

        if let Some(thread_id) = updated.thread_id() {
            if let Some(thread) = self.threads.iter_mut().find(|thread| thread.id == thread_id) {
                thread.touch(now);
            }
        }

        Ok(updated)
    }

    /// Removes a leaf note and maintains its thread.
    pub fn delete_note(&mut self, id: &str, now: Timestamp) -> Result<DeleteOutcome, CollectionError> {
        let index = self
            .notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| CollectionError::NoteNotFound(id.to_string()))?;

        let reply_count = self.reply_count(id);
        if reply_count > 0 {
            return Err(CollectionError::HasReplies {
                note_id: id.to_string(),
                reply_count,
            });
        }

        let note = self.notes.remove(index);
        let thread = match note.thread_id() {
            Some(thread_id) => self.detach_from_thread(thread_id, now),
            None => ThreadChange::Unchanged,
        };

        Ok(DeleteOutcome { note, thread })
    }

    fn detach_from_thread(&mut self, thread_id: &str, now: Timestamp) -> ThreadChange {
        let Some(thread_index) = self.threads.iter().position(|thread| thread.id == thread_id)
        else {
            return ThreadChange::Unchanged;
        };

        if self.thread_member_count(thread_id) == 0 {
            let removed = self.threads.remove(thread_index);
            return ThreadChange::Removed(removed.id);
        }

        let thread = &mut self.threads[thread_index];
        thread.note_count = thread.note_count.saturating_sub(1);
        thread.touch(now);
        ThreadChange::Decremented(thread.clone())
    }

    fn ordered_by_position(&self, predicate: impl Fn(&Note) -> bool) -> Vec<Note> {
        let mut notes = self
            .notes_newest_first()
            .into_iter()
            .filter(|note| predicate(note))
            .collect::<Vec<_>>();
        notes.sort_by_key(Note::sort_position);
        notes
    }
}

fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
