//! Semantic retrieval over an embedded corpus of classical Chinese poems.
//!
//! A [`CorpusStore`] is loaded once at startup; a [`Retriever`] then answers
//! `search(query, top_k)` by embedding the query through an
//! [`EmbeddingProvider`] and ranking every poem by cosine similarity.

pub mod builder;
pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod retriever;
pub mod similarity;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::{build_corpus, BuildOptions, BuildStats, SourceSpec};
pub use context::{context_or_fallback, format_context, PoemContext};
pub use corpus::CorpusStore;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use error::{RetrievalError, RetrievalResult};
pub use retriever::Retriever;
pub use types::{CorpusManifest, CorpusStats, Document, ScoredResult};

use harmony_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Load the configured corpus and wire it to the configured provider.
pub fn open_retriever(config: &AppConfig) -> AppResult<Retriever> {
    let embedding = EmbeddingConfig::from_app_config(config);
    let corpus = Arc::new(CorpusStore::load(&config.corpus_path())?);
    let provider = create_provider(&embedding)?;

    tracing::debug!(
        "Opening retriever: provider={}, model={}, documents={}",
        embedding.provider,
        embedding.model,
        corpus.len()
    );

    Ok(Retriever::new(provider, corpus, embedding.model.clone())?.with_timeout(embedding.timeout()))
}

/// Summarise the configured corpus without contacting any provider.
pub fn corpus_stats(config: &AppConfig) -> AppResult<CorpusStats> {
    Ok(CorpusStore::load(&config.corpus_path())?.stats())
}

/// Build a corpus from raw sources with the configured provider and save it
/// (plus manifest) to the configured corpus path.
pub async fn build(
    config: &AppConfig,
    options: &BuildOptions,
) -> AppResult<(BuildStats, CorpusManifest)> {
    let embedding = EmbeddingConfig::from_app_config(config);
    let provider = create_provider(&embedding)?;

    let (store, stats) = build_corpus(provider.as_ref(), &embedding.model, options).await?;
    let manifest = store.save(&config.corpus_path(), &embedding.provider, &embedding.model)?;

    Ok((stats, manifest))
}
