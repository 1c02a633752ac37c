//! Note/thread domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` and `Thread` records and their JSON shape.
//! - Hold the in-memory collection pair and every pure query/mutation over it.
//!
//! # Invariants
//! - Every note with a `threadId` has a matching `Thread` record.
//! - `Thread::note_count` equals the number of live notes in that thread.
//! - Thread positions are assigned once and never compacted.

pub mod backup;
pub mod collections;
pub mod note;
pub mod thread;
pub mod timestamp;
