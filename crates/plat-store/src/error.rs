//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use plat_model::GeometryError;

/// Session resolution error.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session id is empty, contains path separators, or other
    /// characters that cannot name a storage directory.
    #[error("invalid session id: {0:?}")]
    InvalidId(String),

    /// The session's storage root could not be created.
    #[error("failed to create session directory: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid geometry input or a malformed entity inside a snapshot.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A referenced object id does not exist in the site.
    #[error("{kind} with id {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Bearing/distance recalculation requested for a non-line segment.
    #[error("segment {id} is not a line segment")]
    NotALine { id: String },

    /// Undo requested with no prior snapshot left in the chain.
    #[error("no actions to undo")]
    NothingToUndo,

    /// A snapshot file exists but does not parse. Fatal for the session
    /// until repaired by hand; no older snapshot is substituted.
    #[error("corrupted snapshot: {path}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A whole-site payload handed to `replace` does not parse.
    #[error("invalid site payload")]
    InvalidPayload {
        #[source]
        source: serde_json::Error,
    },

    /// File I/O failure.
    #[error("failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
