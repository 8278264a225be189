//! Retrieval type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used for missing descriptive fields.
pub const UNKNOWN: &str = "Unknown";

/// One retrievable poem with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Poem title (not guaranteed unique)
    pub title: String,

    /// Author, `"Unknown"` when the source had none
    pub author: String,

    /// Dynasty or category tag (e.g. "Tang", "Song", "Classic")
    pub dynasty: String,

    /// Full text body; the unit of retrieval
    pub content: String,

    /// Embedding of the canonical text, computed at corpus-build time
    pub embedding: Vec<f32>,
}

/// A document's descriptive fields plus its similarity to the query.
///
/// The embedding is never returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub title: String,
    pub author: String,
    pub dynasty: String,
    pub content: String,

    /// Cosine similarity in [-1, 1]; higher is more relevant
    pub score: f32,
}

impl ScoredResult {
    pub(crate) fn from_document(document: &Document, score: f32) -> Self {
        Self {
            title: document.title.clone(),
            author: document.author.clone(),
            dynasty: document.dynasty.clone(),
            content: document.content.clone(),
            score,
        }
    }
}

/// Sidecar describing how a corpus file was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusManifest {
    /// Embedding provider used at build time
    pub provider: String,

    /// Embedding model identifier; queries must use the same one
    pub model: String,

    /// Vector dimensionality shared by every document
    pub dimensions: usize,

    /// Number of documents in the corpus file
    pub documents: usize,

    /// When the corpus was written
    pub built_at: DateTime<Utc>,

    /// Hex SHA-256 of the corpus file bytes
    pub sha256: String,
}

/// Summary of a loaded corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of documents
    pub documents: usize,

    /// Embedding dimensionality, `None` for an empty corpus
    pub dimensions: Option<usize>,

    /// Model recorded in the manifest, if any
    pub model: Option<String>,

    /// Document count per dynasty/category
    pub dynasties: BTreeMap<String, usize>,
}
