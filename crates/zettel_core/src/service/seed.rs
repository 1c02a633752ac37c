//! Default notes written into an empty store.
//!
//! Nine notes and one four-note thread (`thread1`: 1 → 3 → 8 → 9) that
//! demonstrate tags, mentions and reply chains.

use crate::model::collections::Collections;
use crate::model::note::Note;
use crate::model::thread::Thread;
use crate::model::timestamp::Timestamp;
use chrono::{TimeZone, Utc};

pub const SEED_THREAD_ID: &str = "thread1";

fn seed_time(day: u32, hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2023, 5, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn note(id: &str, content: &str, tags: &[&str], created_at: Timestamp) -> Note {
    Note::new(
        id,
        content,
        tags.iter().map(|tag| tag.to_string()).collect(),
        created_at,
    )
}

fn threaded(mut note: Note, parent_id: Option<&str>, position: u32) -> Note {
    note.thread_id = Some(SEED_THREAD_ID.to_string());
    note.parent_id = parent_id.map(str::to_string);
    note.position = Some(position);
    note
}

/// Builds the seed collections.
pub fn default_collections() -> Collections {
    let notes = vec![
        threaded(
            note(
                "1",
                "Just learned about the #zettelkasten method for note-taking. It's a game-changer for organizing thoughts and ideas! #productivity",
                &["zettelkasten", "productivity"],
                seed_time(15, 10, 30),
            ),
            None,
            0,
        ),
        note(
            "2",
            "Reading 'How to Take Smart Notes' by Sönke Ahrens. Highly recommend for anyone interested in #zettelkasten and #PKM (Personal Knowledge Management).",
            &["books", "zettelkasten", "PKM"],
            seed_time(16, 14, 20),
        ),
        threaded(
            note(
                "3",
                "The key to effective note-taking is to focus on connections between ideas rather than categorization. This is why #zettelkasten works so well. @note1",
                &["zettelkasten", "ideas"],
                seed_time(17, 9, 15),
            ),
            Some("1"),
            1,
        ),
        note(
            "4",
            "Started a new #research project on cognitive biases. Will be collecting notes and examples over the next few weeks.",
            &["research", "psychology"],
            seed_time(18, 16, 45),
        ),
        note(
            "5",
            "Atomic notes should be self-contained and focused on a single idea. This makes them more reusable across different contexts. #PKM #productivity",
            &["PKM", "productivity"],
            seed_time(19, 11, 10),
        ),
        note(
            "6",
            "Working on a new #project to visualize the connections between my notes. Thinking of using D3.js for the visualization. #coding",
            &["project", "coding", "visualization"],
            seed_time(20, 13, 25),
        ),
        note(
            "7",
            "Found an interesting connection between my notes on #psychology and #productivity. The way we structure information affects how we process it.",
            &["psychology", "productivity", "connections"],
            seed_time(21, 10, 5),
        ),
        threaded(
            note(
                "8",
                "Building on this idea, I've started categorizing my notes based on mental models rather than traditional categories. #PKM",
                &["PKM", "mental-models"],
                seed_time(21, 10, 15),
            ),
            Some("3"),
            2,
        ),
        threaded(
            note(
                "9",
                "This approach has helped me discover unexpected connections between seemingly unrelated topics. #connections #insights",
                &["connections", "insights"],
                seed_time(21, 10, 25),
            ),
            Some("8"),
            3,
        ),
    ];

    let threads = vec![Thread {
        id: SEED_THREAD_ID.to_string(),
        title: Some("Zettelkasten Method Exploration".to_string()),
        created_at: seed_time(15, 10, 30),
        updated_at: seed_time(21, 10, 25),
        note_count: 4,
    }];

    Collections::new(notes, threads)
}
