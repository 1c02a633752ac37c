//! Backup document exchanged by export/import.
//!
//! Shape: `{ "notes": [...], "threads": [...], "lastSync": "..." | null }`.
//! Import accepts the document as-is; referential integrity is not checked.

use crate::model::collections::Collections;
use crate::model::note::Note;
use crate::model::thread::Thread;
use crate::model::timestamp::{self, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Application name used in storage keys and backup file names.
pub const APP_NAME: &str = "zetteltweet";

/// Full snapshot of persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub notes: Vec<Note>,
    pub threads: Vec<Thread>,
    #[serde(default, with = "timestamp::option")]
    pub last_sync: Option<Timestamp>,
}

impl Backup {
    pub fn into_collections(self) -> (Collections, Option<Timestamp>) {
        (Collections::new(self.notes, self.threads), self.last_sync)
    }
}

/// `zetteltweet-backup-<YYYY-MM-DD>.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("{APP_NAME}-backup-{}.json", date.format("%Y-%m-%d"))
}
