//! Pipeline error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, resolving or emitting tokens
#[derive(Error, Debug)]
pub enum TokenError {
    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A token source file is not valid JSON
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A token source file is valid JSON but not a token document
    #[error("Invalid token document {path}: {message}")]
    InvalidToken { path: PathBuf, message: String },

    /// A placeholder points at a token that does not exist
    #[error("Token `{token}` references unknown token `{reference}`")]
    UnresolvedReference { token: String, reference: String },

    /// Placeholders form a cycle
    #[error("Circular token reference: {chain}")]
    CircularReference { chain: String },

    /// The token tree could not be discovered
    #[error("Source discovery failed: {0}")]
    Discovery(String),
}

impl TokenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the incremental cache store
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache file {path} is malformed: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, TokenError>;
