// Error types shared by the storage backends and the entity layer

use std::path::PathBuf;

use thiserror::Error;

use crate::entities::EntityKind;

/// Failures raised by a storage backend.
///
/// The storage layer only fails when the backend itself fails; nothing here
/// is caught or retried further up.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The relational backend has no table for this kind (BaseModel)
    #[error("{0} is not mapped to a table")]
    Unmapped(EntityKind),

    #[error("storage is not open, call reload() first")]
    NotOpen,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Rejected attribute assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute '{0}' is read-only")]
    ReadOnly(String),

    #[error("value {value} cannot be assigned to '{name}'")]
    Malformed { name: String, value: String },
}
