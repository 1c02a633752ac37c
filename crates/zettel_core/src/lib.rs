//! Core storage and domain logic for ZettelTweet.
//! Notes, reply threads and tags persisted through a pluggable key-value backend.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod markup;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{open_store, BackendConfig, ConfigError, DynNoteStore, OpenError, StoreConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use markup::{inline_mentions, inline_tags, tokenize, Segment};
pub use model::backup::{backup_file_name, Backup};
pub use model::collections::{Collections, TagCount, TagLink};
pub use model::note::{Note, NoteId, NotePatch};
pub use model::thread::{Thread, ThreadId};
pub use model::timestamp::Timestamp;
pub use search::text::QUICK_SEARCH_LIMIT;
pub use service::error::{StoreError, StoreResult};
pub use service::note_store::{InitOutcome, NoteStore, StorageUsage};
pub use storage::{
    FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage, StorageError, StorageResult,
    WriteBatch,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
