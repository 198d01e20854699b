//! Storage error handling
//!
//! Every core operation fails with a [`StoreError`]. Callers map errors to
//! their own representation through [`StoreError::kind`], which is a 1:1
//! projection onto the five caller-visible classes.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Caller-visible error class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced block, user or setting is absent
    NotFound,
    /// Malformed input (unknown search field, broken parent reference)
    BadRequest,
    /// Principal lacks the required access
    Permission,
    /// Uniqueness violation
    Conflict,
    /// Backend I/O or connectivity failure
    Storage,
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Referenced record does not exist
    #[error("{entity} not found: '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before touching the backend
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Block declares a parent that is not stored
    #[error("Block '{block_id}' references missing parent '{parent_id}'")]
    MissingParent { block_id: String, parent_id: String },

    /// Block declares itself as its own parent
    #[error("Block '{block_id}' cannot be its own parent")]
    SelfParent { block_id: String },

    /// Re-parenting would make a block its own ancestor
    #[error("Moving block '{block_id}' under '{parent_id}' would create a cycle")]
    Cycle { block_id: String, parent_id: String },

    /// Principal lacks access
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Unique field already taken by another record
    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored JSON payload could not be encoded or decoded
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Failed to prepare the database location
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Store was shut down
    #[error("Store has been shut down")]
    Closed,
}

impl StoreError {
    /// Shorthand for a missing record
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The caller-visible class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::BadRequest(_)
            | StoreError::MissingParent { .. }
            | StoreError::SelfParent { .. }
            | StoreError::Cycle { .. } => ErrorKind::BadRequest,
            StoreError::Permission(_) => ErrorKind::Permission,
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::Database(_)
            | StoreError::Payload(_)
            | StoreError::Io { .. }
            | StoreError::Closed => ErrorKind::Storage,
        }
    }

    /// Check if the backend reported a transient lock condition
    ///
    /// The core never retries on its own; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::MissingParent { .. } => {
                Some("Create the parent block first, or insert this block as a root.")
            }
            StoreError::Conflict { .. } => Some("Pick a different value for the conflicting field."),
            StoreError::Io { .. } => {
                Some("Check that the data directory exists and you have write permissions.")
            }
            StoreError::Closed => Some("Open a new store; this instance has been shut down."),
            _ if self.is_retryable() => {
                Some("The database is busy. Try again once other writers finish.")
            }
            _ => None,
        }
    }
}

/// Column named by a UNIQUE / PRIMARY KEY violation, if `error` is one
///
/// SQLite reports these as `UNIQUE constraint failed: users.email`.
pub(crate) fn unique_violation_column(error: &rusqlite::Error) -> Option<&str> {
    match error {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            let (_, columns) = msg.split_once("UNIQUE constraint failed: ")?;
            let first = columns.split(',').next()?.trim();
            first.rsplit('.').next()
        }
        _ => None,
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
