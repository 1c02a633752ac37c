//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and its camelCase JSON shape.
//! - Provide thread-membership helpers used by queries.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - A thread starter has `thread_id` set, `position == Some(0)` and no
//!   `parent_id`.
//! - `tags` keep caller order and are never deduplicated here.

use crate::model::thread::ThreadId;
use crate::model::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable note identifier.
///
/// Seeded and imported notes may carry arbitrary ids (`"1"`, `"9"`), so this
/// stays a string rather than a parsed UUID.
pub type NoteId = String;

const NOTE_ID_PREFIX: &str = "note-";

/// One short, tweet-like note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Raw body text. `#tag`/`@mention` markup is interpreted only when rendering.
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NoteId>,
    /// 0 for the thread starter, then arrival order. May contain gaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl Note {
    /// Creates a standalone note with no thread linkage.
    pub fn new(
        id: impl Into<NoteId>,
        content: impl Into<String>,
        tags: Vec<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at,
            tags,
            thread_id: None,
            parent_id: None,
            position: None,
        }
    }

    /// Mints a fresh, globally unique note id.
    pub fn generate_id() -> NoteId {
        format!("{NOTE_ID_PREFIX}{}", Uuid::new_v4())
    }

    /// Returns the thread id when it is present and non-empty.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref().filter(|value| !value.is_empty())
    }

    pub fn is_threaded(&self) -> bool {
        self.thread_id().is_some()
    }

    pub fn belongs_to(&self, thread_id: &str) -> bool {
        self.thread_id.as_deref() == Some(thread_id)
    }

    pub fn is_reply_to(&self, note_id: &str) -> bool {
        self.parent_id.as_deref() == Some(note_id)
    }

    pub fn is_thread_starter(&self) -> bool {
        self.is_threaded() && self.position == Some(0)
    }

    /// Exact, case-sensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag)
    }

    /// Position used for ordering; a missing position sorts as 0.
    pub fn sort_position(&self) -> u32 {
        self.position.unwrap_or(0)
    }
}

/// Partial update for an existing note.
///
/// Identity, creation time and thread linkage cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NotePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tags: None,
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            content: None,
            tags: Some(tags),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.tags.is_none()
    }

    /// Merges provided fields into `note`, leaving absent fields untouched.
    pub fn apply_to(self, note: &mut Note) {
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(tags) = self.tags {
            note.tags = tags;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, NotePatch};
    use chrono::{TimeZone, Utc};

    fn sample() -> Note {
        Note::new(
            "n1",
            "hello #x",
            vec!["x".to_string()],
            Utc.with_ymd_and_hms(2023, 5, 15, 10, 30, 0).unwrap(),
        )
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let first = Note::generate_id();
        let second = Note::generate_id();
        assert!(first.starts_with("note-"));
        assert_ne!(first, second);
    }

    #[test]
    fn empty_thread_id_is_not_a_thread() {
        let mut note = sample();
        note.thread_id = Some(String::new());
        note.position = Some(0);
        assert!(!note.is_threaded());
        assert!(!note.is_thread_starter());
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_linkage() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["createdAt"], "2023-05-15T10:30:00.000Z");
        assert!(json.get("threadId").is_none());
        assert!(json.get("parentId").is_none());
        assert!(json.get("position").is_none());
    }

    #[test]
    fn deserializes_browser_shape_without_tags() {
        let note: Note = serde_json::from_str(
            r#"{"id":"3","content":"c","createdAt":"2023-05-17T09:15:00Z","threadId":"thread1","parentId":"1","position":1}"#,
        )
        .unwrap();
        assert!(note.tags.is_empty());
        assert_eq!(note.thread_id(), Some("thread1"));
        assert!(note.is_reply_to("1"));
        assert_eq!(note.sort_position(), 1);
    }

    #[test]
    fn patch_merges_only_provided_fields() {
        let mut note = sample();
        NotePatch::content("edited").apply_to(&mut note);
        assert_eq!(note.content, "edited");
        assert_eq!(note.tags, vec!["x".to_string()]);
        assert!(NotePatch::default().is_empty());
    }
}
