//! Error types for editor operations.
//!
//! Scene store, gesture and path operations are total and never fail; these
//! errors only come from the fallible edges (configuration and documents).

use thiserror::Error;

/// Result type for editor operations.
pub type StoryResult<T> = Result<T, StoryError>;

/// Errors that can occur outside the in-memory editing core.
#[derive(Debug, Error)]
pub enum StoryError {
    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scene document could not be turned into a scene.
    #[error("Invalid scene document: {0}")]
    InvalidDocument(String),

    /// Identifier text is not a valid UUID.
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration or document file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
