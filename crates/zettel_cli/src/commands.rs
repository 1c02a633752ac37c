//! Command execution against an opened store.
//!
//! Output goes to a caller-supplied writer so the binary can use stdout and
//! tests can capture plain text.

use crate::args::{Command, UsageError};
use chrono::Local;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use zettel_core::{
    backup_file_name, inline_mentions, inline_tags, Clock, ConfigError, KeyValueStorage, Note,
    NotePatch, NoteStore, OpenError, StoreError, Thread,
};

const PREVIEW_CHARS: usize = 60;

#[derive(Debug)]
pub enum CliError {
    Usage(UsageError),
    Config(ConfigError),
    Open(OpenError),
    Store(StoreError),
    Missing { entity: &'static str, id: String },
    Io { path: PathBuf, source: std::io::Error },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Open(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Missing { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Usage(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Open(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Missing { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<UsageError> for CliError {
    fn from(value: UsageError) -> Self {
        Self::Usage(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<OpenError> for CliError {
    fn from(value: OpenError) -> Self {
        Self::Open(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub(crate) fn stdout_error(source: std::io::Error) -> CliError {
    CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}

/// Runs one parsed command. `Help` is handled by the caller.
pub fn run<S, C, W>(command: Command, store: &mut NoteStore<S, C>, out: &mut W) -> Result<(), CliError>
where
    S: KeyValueStorage,
    C: Clock,
    W: Write,
{
    match command {
        Command::Help => Ok(()),
        Command::List => print_notes(out, &store.list_notes()),
        Command::Show { id } => {
            let note = store.get_note(&id).ok_or(CliError::Missing {
                entity: "note",
                id: id.clone(),
            })?;
            let replies = store.list_replies(&id);
            print_note_detail(out, &note, &replies)
        }
        Command::Tag { name } => print_notes(out, &store.list_notes_by_tag(&name)),
        Command::Tags => {
            for count in store.list_tags() {
                writeln!(out, "#{}\t{}", count.tag, count.note_count).map_err(stdout_error)?;
            }
            Ok(())
        }
        Command::Links => {
            for link in store.list_connections() {
                writeln!(
                    out,
                    "{} -- {}\t#{}",
                    link.source,
                    link.target,
                    link.shared_tags.join(" #")
                )
                .map_err(stdout_error)?;
            }
            Ok(())
        }
        Command::Threads => {
            for thread in store.list_threads() {
                print_thread_line(out, &thread)?;
            }
            Ok(())
        }
        Command::Thread { id } => {
            let thread = store.get_thread(&id).ok_or(CliError::Missing {
                entity: "thread",
                id: id.clone(),
            })?;
            print_thread_line(out, &thread)?;
            for note in store.list_thread_notes(&id) {
                writeln!(
                    out,
                    "  [{}] {}  {}",
                    note.sort_position(),
                    note.id,
                    preview(&note.content)
                )
                .map_err(stdout_error)?;
            }
            Ok(())
        }
        Command::New { content, tags } => {
            let note = store.create_note(content, tags)?;
            writeln!(out, "created {}", note.id).map_err(stdout_error)
        }
        Command::Start { content, tags } => {
            let note = store.start_thread(content, tags)?;
            writeln!(
                out,
                "started thread {} with {}",
                note.thread_id().unwrap_or_default(),
                note.id
            )
            .map_err(stdout_error)
        }
        Command::Reply {
            parent_id,
            content,
            tags,
        } => {
            let note = store.reply_to_note(&parent_id, content, tags)?;
            writeln!(
                out,
                "replied {} in thread {} at position {}",
                note.id,
                note.thread_id().unwrap_or_default(),
                note.sort_position()
            )
            .map_err(stdout_error)
        }
        Command::Edit { id, content, tags } => {
            let note = store.update_note(&id, NotePatch { content, tags })?;
            writeln!(out, "updated {}", note.id).map_err(stdout_error)
        }
        Command::Delete { id } => {
            store.delete_note(&id)?;
            writeln!(out, "deleted {id}").map_err(stdout_error)
        }
        Command::Search { query, limit } => print_notes(out, &store.search_notes(&query, limit)),
        Command::Export { dir } => {
            let document = store.export_json()?;
            fs::create_dir_all(&dir).map_err(|source| CliError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = dir.join(backup_file_name(Local::now().date_naive()));
            fs::write(&path, document).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            writeln!(out, "exported to {}", path.display()).map_err(stdout_error)
        }
        Command::Import { file } => {
            let document = fs::read_to_string(&file).map_err(|source| CliError::Io {
                path: file.clone(),
                source,
            })?;
            store.import_json(&document)?;
            writeln!(
                out,
                "imported {} notes and {} threads",
                store.list_notes().len(),
                store.list_threads().len()
            )
            .map_err(stdout_error)
        }
        Command::Usage => {
            let usage = store.storage_usage();
            writeln!(
                out,
                "backend {}: {:.2} KB of {:.0} KB used ({:.2}%)",
                store.storage().backend_name(),
                usage.used_kb,
                usage.total_kb,
                usage.percentage
            )
            .map_err(stdout_error)?;
            let last_sync = store
                .last_sync()
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            writeln!(out, "last sync: {last_sync}").map_err(stdout_error)
        }
        Command::Clear => {
            store.clear_data()?;
            writeln!(out, "cleared all notes and threads").map_err(stdout_error)
        }
    }
}

fn print_notes<W: Write>(out: &mut W, notes: &[Note]) -> Result<(), CliError> {
    if notes.is_empty() {
        return writeln!(out, "no notes").map_err(stdout_error);
    }
    for note in notes {
        writeln!(out, "{}", note_line(note)).map_err(stdout_error)?;
    }
    Ok(())
}

fn note_line(note: &Note) -> String {
    let mut line = format!(
        "{}  {}  {}",
        note.id,
        note.created_at.format("%Y-%m-%d %H:%M"),
        preview(&note.content)
    );
    if !note.tags.is_empty() {
        let tags = note
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        line.push_str(&format!("  [{tags}]"));
    }
    if let Some(thread_id) = note.thread_id() {
        line.push_str(&format!("  ({thread_id}:{})", note.sort_position()));
    }
    line
}

fn print_note_detail<W: Write>(out: &mut W, note: &Note, replies: &[Note]) -> Result<(), CliError> {
    let mut lines = vec![
        format!("id: {}", note.id),
        format!("created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ];
    if !note.tags.is_empty() {
        lines.push(format!("tags: {}", note.tags.join(", ")));
    }
    if let Some(thread_id) = note.thread_id() {
        lines.push(format!("thread: {thread_id} (position {})", note.sort_position()));
    }
    if let Some(parent_id) = &note.parent_id {
        lines.push(format!("reply to: {parent_id}"));
    }
    lines.push(String::new());
    lines.push(note.content.clone());

    let hashtags = inline_tags(&note.content);
    let mentions = inline_mentions(&note.content);
    if !hashtags.is_empty() || !mentions.is_empty() {
        lines.push(String::new());
    }
    if !hashtags.is_empty() {
        lines.push(format!("hashtags: #{}", hashtags.join(" #")));
    }
    if !mentions.is_empty() {
        lines.push(format!("mentions: @{}", mentions.join(" @")));
    }
    if !replies.is_empty() {
        lines.push(String::new());
        lines.push(format!("replies ({}):", replies.len()));
        lines.extend(replies.iter().map(|reply| format!("  {}", note_line(reply))));
    }

    for line in lines {
        writeln!(out, "{line}").map_err(stdout_error)?;
    }
    Ok(())
}

fn print_thread_line<W: Write>(out: &mut W, thread: &Thread) -> Result<(), CliError> {
    writeln!(
        out,
        "{}  {} note{}  updated {}  {}",
        thread.id,
        thread.note_count,
        if thread.note_count == 1 { "" } else { "s" },
        thread.updated_at.format("%Y-%m-%d %H:%M"),
        thread.title.as_deref().unwrap_or("(untitled)")
    )
    .map_err(stdout_error)
}

/// First line of `content`, capped for single-line listings.
fn preview(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default();
    if first_line.chars().count() <= PREVIEW_CHARS {
        return first_line.to_string();
    }
    let mut cut = first_line.chars().take(PREVIEW_CHARS).collect::<String>();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{preview, run, CliError};
    use crate::args::Command;
    use chrono::{TimeDelta, TimeZone, Utc};
    use zettel_core::{FixedClock, MemoryStorage, NoteStore};

    fn seeded() -> NoteStore<MemoryStorage, FixedClock> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut store = NoteStore::with_clock(
            MemoryStorage::new(),
            FixedClock::stepping(start, TimeDelta::seconds(1)),
        );
        store.initialize().unwrap();
        store
    }

    fn output(command: Command, store: &mut NoteStore<MemoryStorage, FixedClock>) -> String {
        let mut out = Vec::new();
        run(command, store, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn preview_keeps_first_line_and_truncates() {
        assert_eq!(preview("one\ntwo"), "one");
        assert!(preview(&"x".repeat(80)).ends_with("..."));
    }

    #[test]
    fn show_lists_markup_and_replies() {
        let mut store = seeded();
        let text = output(Command::Show { id: "3".to_string() }, &mut store);
        assert!(text.contains("thread: thread1 (position 1)"));
        assert!(text.contains("hashtags: #zettelkasten"));
        assert!(text.contains("mentions: @note1"));
        assert!(text.contains("replies (1):"));
    }

    #[test]
    fn thread_prints_members_in_position_order() {
        let mut store = seeded();
        let text = output(
            Command::Thread {
                id: "thread1".to_string(),
            },
            &mut store,
        );
        let order = ["[0] 1", "[1] 3", "[2] 8", "[3] 9"]
            .iter()
            .map(|marker| text.find(marker).unwrap())
            .collect::<Vec<_>>();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn missing_thread_is_reported() {
        let mut store = seeded();
        let err = run(
            Command::Thread {
                id: "nope".to_string(),
            },
            &mut store,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Missing { entity: "thread", .. }));
    }

    #[test]
    fn tags_prints_counts() {
        let mut store = seeded();
        let text = output(Command::Tags, &mut store);
        assert!(text.lines().any(|line| line == "#PKM\t3"));
    }

    #[test]
    fn links_print_shared_tags() {
        let mut store = seeded();
        let text = output(Command::Links, &mut store);
        assert!(text.lines().any(|line| line == "2 -- 1\t#zettelkasten"), "{text}");
    }
}
