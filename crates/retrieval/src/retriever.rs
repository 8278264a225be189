//! Semantic poem retrieval.
//!
//! Brute-force cosine ranking over the in-memory corpus. A search embeds the
//! query once, scores every document, stable-sorts by score and truncates.

use crate::corpus::CorpusStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::{RetrievalError, RetrievalResult};
use crate::similarity::cosine_similarity;
use crate::types::ScoredResult;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default deadline for the query embedding call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ranks corpus documents against free-text queries.
///
/// Cheap to clone; clones share the provider and the corpus. The corpus is
/// never mutated, so concurrent searches need no locking.
#[derive(Debug, Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Arc<CorpusStore>,
    model: String,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever that embeds queries with `model`.
    ///
    /// Fails with [`RetrievalError::ModelMismatch`] when the corpus manifest
    /// records a different embedding model.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        corpus: Arc<CorpusStore>,
        model: impl Into<String>,
    ) -> RetrievalResult<Self> {
        let model = model.into();

        if let Some(manifest) = corpus.manifest() {
            if manifest.model != model {
                return Err(RetrievalError::ModelMismatch {
                    corpus: manifest.model.clone(),
                    configured: model,
                });
            }
        }

        Ok(Self {
            provider,
            corpus,
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the deadline for the query embedding call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Return the `top_k` documents most similar to `query`, best first.
    ///
    /// Makes exactly one provider call unless the answer is known to be
    /// empty (`top_k == 0` or an empty corpus), in which case none is made.
    /// Ties keep corpus order. Any provider failure, timeout or unusable
    /// query vector yields [`RetrievalError::EmbeddingUnavailable`] and no
    /// results.
    #[instrument(skip(self, query), fields(query_len = query.len(), corpus = self.corpus.len()))]
    pub async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<ScoredResult>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be blank".to_string(),
            ));
        }

        if top_k == 0 || self.corpus.is_empty() {
            debug!("Nothing to rank; skipping embedding call");
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_query(query).await?;
        let scores = self.score_all(&query_embedding)?;
        let ranked = rank(&scores, top_k);

        let documents = self.corpus.all();
        let results: Vec<ScoredResult> = ranked
            .into_iter()
            .map(|(index, score)| ScoredResult::from_document(&documents[index], score))
            .collect();

        info!(
            "Retrieved {} of {} documents (top score {:.4})",
            results.len(),
            documents.len(),
            results.first().map(|r| r.score).unwrap_or(0.0)
        );

        Ok(results)
    }

    async fn embed_query(&self, query: &str) -> RetrievalResult<Vec<f32>> {
        let provider = self.provider.provider_name().to_string();

        let embedding = tokio::time::timeout(self.timeout, self.provider.embed(query, &self.model))
            .await
            .map_err(|_| {
                RetrievalError::unavailable(
                    &provider,
                    format!("embedding request timed out after {:?}", self.timeout),
                )
            })?
            .map_err(|e| RetrievalError::unavailable(&provider, e.to_string()))?;

        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(RetrievalError::unavailable(
                &provider,
                "query embedding contains non-finite values",
            ));
        }

        Ok(embedding)
    }

    /// Score every document against a query embedding, in corpus order.
    ///
    /// Pure: the same inputs always produce bit-identical scores.
    pub fn score_all(&self, query_embedding: &[f32]) -> RetrievalResult<Vec<f32>> {
        if let Some(expected) = self.corpus.dimensions() {
            if query_embedding.len() != expected {
                return Err(RetrievalError::unavailable(
                    self.provider.provider_name(),
                    format!(
                        "query embedding has {} dimensions, corpus has {}",
                        query_embedding.len(),
                        expected
                    ),
                ));
            }
        }

        Ok(self
            .corpus
            .all()
            .iter()
            .map(|doc| cosine_similarity(query_embedding, &doc.embedding))
            .collect())
    }
}

/// Order `(index, score)` pairs by score descending and keep the first `top_k`.
///
/// The sort is stable, so equal scores keep ascending index order.
pub fn rank(scores: &[f32], top_k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_k);
    ranked
}
