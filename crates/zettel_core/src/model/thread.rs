//! Thread domain model.
//!
//! # Invariants
//! - `note_count` mirrors the number of notes whose `thread_id` is this id.
//! - `title` is derived once, when the record is created, and never recomputed.

use crate::model::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable thread identifier.
pub type ThreadId = String;

const THREAD_ID_PREFIX: &str = "thread-";
/// Maximum title length in characters before the ellipsis is appended.
pub const THREAD_TITLE_MAX_CHARS: usize = 50;
const THREAD_TITLE_ELLIPSIS: &str = "...";

/// Denormalized metadata for one thread of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub note_count: u32,
}

impl Thread {
    /// Creates a thread whose title is derived from `title_source`.
    pub fn new(
        id: impl Into<ThreadId>,
        title_source: &str,
        note_count: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: derive_thread_title(title_source),
            created_at: now,
            updated_at: now,
            note_count,
        }
    }

    /// Mints a fresh, globally unique thread id.
    pub fn generate_id() -> ThreadId {
        format!("{THREAD_ID_PREFIX}{}", Uuid::new_v4())
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }
}

/// Derives a thread title from note content.
///
/// Returns `None` for blank content. Longer content is cut to
/// `THREAD_TITLE_MAX_CHARS` characters and suffixed with `...`.
pub fn derive_thread_title(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    let mut title = content
        .chars()
        .take(THREAD_TITLE_MAX_CHARS)
        .collect::<String>();
    if content.chars().count() > THREAD_TITLE_MAX_CHARS {
        title.push_str(THREAD_TITLE_ELLIPSIS);
    }
    Some(title)
}

#[cfg(test)]
mod tests {
    use super::{derive_thread_title, Thread, THREAD_TITLE_MAX_CHARS};
    use chrono::{TimeZone, Utc};

    #[test]
    fn short_content_is_kept_verbatim() {
        assert_eq!(derive_thread_title("short idea").as_deref(), Some("short idea"));
    }

    #[test]
    fn exactly_fifty_chars_has_no_ellipsis() {
        let content = "a".repeat(THREAD_TITLE_MAX_CHARS);
        assert_eq!(derive_thread_title(&content), Some(content.clone()));
    }

    #[test]
    fn long_content_is_truncated_on_char_boundaries() {
        let content = "ö".repeat(60);
        let title = derive_thread_title(&content).unwrap();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), THREAD_TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn blank_content_has_no_title() {
        assert!(derive_thread_title("   ").is_none());
    }

    #[test]
    fn new_thread_starts_with_equal_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let thread = Thread::new("t1", "starter", 1, now);
        assert_eq!(thread.created_at, thread.updated_at);
        assert_eq!(thread.note_count, 1);
        assert!(Thread::generate_id().starts_with("thread-"));
    }

    #[test]
    fn json_uses_note_count_field_name() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let json = serde_json::to_value(Thread::new("t1", "starter", 4, now)).unwrap();
        assert_eq!(json["noteCount"], 4);
        assert_eq!(json["updatedAt"], "2024-02-01T08:00:00.000Z");
    }
}
