//! Linear substring search over notes.
//!
//! # Invariants
//! - Matching is case-insensitive over content and every tag.
//! - Blank queries match nothing.
//! - Input order is preserved; callers pass notes already sorted.

use crate::model::note::Note;

/// Result cap used by quick-search dropdowns.
pub const QUICK_SEARCH_LIMIT: usize = 5;

/// Normalized search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    needle: String,
    pub limit: Option<usize>,
}

impl TextQuery {
    /// Returns `None` when `text` is blank after trimming.
    pub fn new(text: &str, limit: Option<usize>) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
            limit,
        })
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, note: &Note) -> bool {
        note.content.to_lowercase().contains(&self.needle)
            || note
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&self.needle))
    }
}

/// Filters `notes` by `query`, keeping at most `query.limit` hits.
pub fn filter_notes(notes: Vec<Note>, query: &TextQuery) -> Vec<Note> {
    let limit = query.limit.unwrap_or(usize::MAX);
    notes
        .into_iter()
        .filter(|note| query.matches(note))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{filter_notes, TextQuery, QUICK_SEARCH_LIMIT};
    use crate::model::note::Note;
    use chrono::{TimeZone, Utc};

    fn note(id: &str, content: &str, tags: &[&str]) -> Note {
        Note::new(
            id,
            content,
            tags.iter().map(|tag| tag.to_string()).collect(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(TextQuery::new("   ", None).is_none());
    }

    #[test]
    fn matches_content_and_tags_case_insensitively() {
        let query = TextQuery::new("PkM", None).unwrap();
        assert!(query.matches(&note("a", "all about pkm", &[])));
        assert!(query.matches(&note("b", "nothing", &["PKM"])));
        assert!(!query.matches(&note("c", "unrelated", &["books"])));
    }

    #[test]
    fn limit_caps_results_in_input_order() {
        let notes = (0..10)
            .map(|idx| note(&idx.to_string(), "rust note", &[]))
            .collect::<Vec<_>>();
        let query = TextQuery::new("rust", Some(QUICK_SEARCH_LIMIT)).unwrap();
        let hits = filter_notes(notes, &query);
        assert_eq!(hits.len(), QUICK_SEARCH_LIMIT);
        assert_eq!(hits[0].id, "0");
    }
}
