//! Error types for Harmony.
//!
//! This module defines a unified error enum that covers every error category
//! in the application: configuration, I/O, embedding providers, the poem
//! corpus, retrieval and serialization.

use thiserror::Error;

/// Unified error type for Harmony.
///
/// Library crates may define narrower error enums, but everything that
/// crosses into the CLI is converted into `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider errors (network, auth, quota, malformed response)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Corpus loading and integrity errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Retrieval errors that are neither provider nor corpus failures
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
