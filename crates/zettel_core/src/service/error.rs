//! Caller-facing store errors.

use crate::model::collections::CollectionError;
use crate::repo::collection_repo::RepoError;
use crate::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation. State is unchanged whenever one is returned.
#[derive(Debug)]
pub enum StoreError {
    /// Note (or reply parent) does not exist.
    NotFound { entity: &'static str, id: String },
    /// Delete blocked by existing replies.
    HasDependents { id: String, replies: usize },
    /// Backend is inaccessible, full, or failed mid-operation.
    StorageUnavailable(StorageError),
    /// Import document or record could not be parsed/encoded.
    Corrupt(String),
}

impl StoreError {
    /// Stable snake_case code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::HasDependents { .. } => "has_dependents",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Corrupt(_) => "corrupt",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::HasDependents { id, replies } => {
                write!(f, "note {id} has {replies} reply note(s) and cannot be deleted")
            }
            Self::StorageUnavailable(err) => write!(f, "{err}"),
            Self::Corrupt(message) => write!(f, "corrupt data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CollectionError> for StoreError {
    fn from(value: CollectionError) -> Self {
        match value {
            CollectionError::NoteNotFound(id) => Self::NotFound { entity: "note", id },
            CollectionError::ParentNotFound(id) => Self::NotFound {
                entity: "parent note",
                id,
            },
            CollectionError::HasReplies {
                note_id,
                reply_count,
            } => Self::HasDependents {
                id: note_id,
                replies: reply_count,
            },
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Storage(err) => Self::StorageUnavailable(err),
            RepoError::Encode(err) => Self::Corrupt(err.to_string()),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::StorageUnavailable(value)
    }
}
