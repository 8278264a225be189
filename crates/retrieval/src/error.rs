//! Retrieval error taxonomy.

use harmony_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading the corpus or answering a search.
///
/// `EmbeddingUnavailable` is distinct from an empty result:
/// callers decide whether to continue without retrieval context.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding provider failed, timed out or returned an unusable vector.
    #[error("Embedding unavailable ({provider}): {reason}")]
    EmbeddingUnavailable {
        /// Provider that was asked for the query embedding.
        provider: String,
        /// What went wrong.
        reason: String,
    },

    /// The corpus violates a load-time invariant.
    #[error("Corpus integrity error: {reason}")]
    CorpusIntegrity {
        /// What is wrong with the corpus.
        reason: String,
    },

    /// The corpus file could not be read.
    #[error("Failed to read corpus {path:?}: {source}")]
    CorpusUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The corpus was embedded with a different model than queries would use.
    #[error("Embedding model mismatch: corpus built with '{corpus}', queries configured for '{configured}'")]
    ModelMismatch { corpus: String, configured: String },

    /// The query was rejected before any provider call.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl RetrievalError {
    pub(crate) fn integrity(reason: impl Into<String>) -> Self {
        RetrievalError::CorpusIntegrity {
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        RetrievalError::EmbeddingUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure came from the embedding provider.
    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(self, RetrievalError::EmbeddingUnavailable { .. })
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::EmbeddingUnavailable { .. } => AppError::Embedding(err.to_string()),
            RetrievalError::CorpusIntegrity { .. } | RetrievalError::ModelMismatch { .. } => {
                AppError::Corpus(err.to_string())
            }
            RetrievalError::CorpusUnreadable { source, .. } => AppError::Io(source),
            RetrievalError::InvalidQuery(_) => AppError::Retrieval(err.to_string()),
        }
    }
}

/// Convenience type alias for retrieval results.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
