use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for draftlog operations
#[derive(Debug, Error)]
pub enum VersioningError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    // Codec errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode log entry payload: {0}")]
    Decode(String),

    #[error("Malformed diff: {0}")]
    MalformedDiff(String),

    // Queue errors
    #[error("Invalid sequence counter in '{path}': '{value}'")]
    CounterParse {
        /// Counter file that holds the bad value
        path: PathBuf,
        /// The value that failed to parse as an integer
        value: String,
    },

    #[error("Document path has no parent directory: '{0}'")]
    NoParentDir(PathBuf),

    #[error("Document path has no file name: '{0}'")]
    NoFileName(PathBuf),
}

/// Result type alias for draftlog operations
pub type Result<T> = std::result::Result<T, VersioningError>;
