//! Domain-level error types for cursor-journal.
//!
//! Every variant names the pipeline stage that failed so a run that aborts
//! leaves a diagnostic pointing at the store, a record, the formatter or the
//! publisher.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The conversation store is missing, unreadable or locked.
    #[error("StoreUnavailable: cannot open {path}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    /// A single raw record could not be decoded. Absorbed by the pipeline.
    #[error("RecordDecodeError: {key}: {message}")]
    RecordDecode { key: String, message: String },

    /// The store holds conversation records but none of them decoded.
    #[error("RecordDecodeError: all {total} conversation record(s) failed to decode")]
    StoreUndecodable { total: usize },

    /// Serializing the export failed; signals an internal contract violation.
    #[error("FormatError: {message}")]
    Format { message: String },

    /// Query failure on an already opened store.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The journaling agent or the git step failed.
    #[error("PublishError ({stage}): {message}")]
    Publish { stage: &'static str, message: String },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a store-unavailable error for the given path.
    pub fn store_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error for a record key.
    pub fn record_decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordDecode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a format error from a serialization failure.
    pub fn format(err: &serde_json::Error) -> Self {
        Self::Format {
            message: err.to_string(),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
