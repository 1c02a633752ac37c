//! Persistence mapping between domain collections and storage records.
//!
//! # Responsibility
//! - Own the record keys and their JSON encoding.
//! - Keep backend details out of the store service.
//!
//! # Invariants
//! - Collections are always written together with the last-sync marker.

pub mod collection_repo;
