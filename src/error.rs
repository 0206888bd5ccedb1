//! Error types for Chatkeeper

use thiserror::Error;

use crate::export::SelectionError;

/// Result type alias for Chatkeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Chatkeeper
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Export argument could not be turned into a selection bound
    #[error("invalid export argument: {0}")]
    Validation(#[from] SelectionError),

    /// An export for this conversation is already in flight
    #[error("export already running for chat {0}")]
    AlreadyRunning(i64),

    /// Message page or media fetch failed
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Transcript write or compression failed
    #[error("archive error: {0}")]
    Archive(String),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Zip container error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
