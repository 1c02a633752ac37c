//! Store use-case services.
//!
//! # Responsibility
//! - Orchestrate load → pure mutation → persist for every write.
//! - Keep CLI and other callers decoupled from storage details.

pub mod error;
pub mod note_store;
pub mod seed;
