//! Error types for objreplay.
//!
//! This module defines all error types used throughout the objreplay crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for objreplay operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Journal Errors ===
    /// Failed to open the journal file.
    #[error("failed to open journal at {path}: {source}")]
    JournalOpen {
        /// Path to the journal file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A journal record could not be decoded.
    #[error("malformed journal record at line {line}: {message}")]
    JournalDecode {
        /// One-based line number of the offending record.
        line: u64,
        /// Description of the decode failure.
        message: String,
    },

    /// Failed to persist the journal offset.
    #[error("failed to commit journal offset to {path}: {source}")]
    OffsetCommit {
        /// Path to the offset file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Exclusion List Errors ===
    /// The exclusion file is not a whole number of digests.
    #[error("exclusion file {path} has {size} bytes, not a multiple of the digest width")]
    ExcludeFileTruncated {
        /// Path to the exclusion file.
        path: PathBuf,
        /// Actual size of the file in bytes.
        size: u64,
    },

    // === Storage Errors ===
    /// An object storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] objreplay_store::StorageError),

    // === Reporter Errors ===
    /// Failed to open the dead-letter database.
    #[error("failed to open dead-letter database at {path}: {source}")]
    ReporterOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A dead-letter database query failed.
    #[error("dead-letter query failed: {0}")]
    ReporterQuery(#[from] rusqlite::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// A replay worker task panicked or was cancelled.
    #[error("replay task failed: {0}")]
    TaskJoin(String),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for objreplay operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a journal decode error.
    #[must_use]
    pub fn journal_decode(line: u64, message: impl Into<String>) -> Self {
        Self::JournalDecode {
            line,
            message: message.into(),
        }
    }

    /// Check if this error is a configuration problem.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad(_) | Self::ConfigValidation { .. })
    }
}
