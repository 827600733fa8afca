// Error types for the Uninote engine
// Storage, validation, auth and lookup failures are kept apart so the
// operation boundary can decide what the user gets to see

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum UninoteError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Validation(String),

    #[error("Incorrect password")]
    Auth,

    #[error("Note not found: {0}")]
    NotFound(String),

    /// The tree changed between acquiring a handle and using it
    #[error("Note {0} moved or was removed while the operation was pending")]
    StaleHandle(String),

    #[error("Invalid data: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UninoteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Lookup failures are logged but never shown to the user
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::StaleHandle(_))
    }
}

pub type Result<T> = std::result::Result<T, UninoteError>;
