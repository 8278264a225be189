//! Caller-level retry wrapper for embedding providers.
//!
//! The retriever makes exactly one provider call per search. Resilience is
//! layered on here instead, by decorating the provider it is given.

use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use harmony_core::{AppError, AppResult};
use std::time::Duration;
use tracing::{instrument, warn};

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Upper bound on a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retries failed embedding calls with exponential backoff.
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    max_retries: u32,
    initial_backoff: Duration,
}

impl<P: EmbeddingProvider> RetryingProvider<P> {
    /// Wrap `inner`, allowing up to `max_retries` attempts after the first failure.
    pub fn new(inner: P, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first backoff delay; later delays double.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Delay before retry number `attempt` (1-based), doubling up to [`MAX_BACKOFF`].
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF)
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for RetryingProvider<P> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = self.inner.provider_name()))]
    async fn embed_batch(&self, texts: &[String], model: &str) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.inner.embed_batch(texts, model).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;

                    if attempt <= self.max_retries {
                        let backoff = self.backoff(attempt);
                        warn!(
                            "Embedding failed (attempt {}/{}): {}; retrying in {:?}",
                            attempt,
                            self.max_retries + 1,
                            e,
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                    }

                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Embedding("Unknown embedding error".to_string())))
    }
}
