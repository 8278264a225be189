//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use crate::embeddings::retry::RetryingProvider;
use harmony_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// The model identifier is passed on every call so the caller stays in
/// charge of using the same model for the corpus and for queries.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String], model: &str) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str, model: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()], model).await?;
        if results.len() != 1 {
            return Err(AppError::Embedding(format!(
                "{} returned {} embeddings for one input",
                self.provider_name(),
                results.len()
            )));
        }
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// When `max_retries` is non-zero the provider is wrapped in a
/// [`RetryingProvider`].
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            let provider = OpenAiProvider::new(
                api_key,
                config.endpoint.as_deref(),
                config.timeout(),
                config.dimensions,
            )?;
            Ok(with_retries(provider, config.max_retries))
        }

        "ollama" => {
            let provider = OllamaProvider::new(config.endpoint.as_deref(), config.timeout())?;
            Ok(with_retries(provider, config.max_retries))
        }

        // Local and deterministic; nothing to retry
        "trigram" => Ok(Arc::new(TrigramProvider::new(
            config.dimensions.unwrap_or(super::providers::trigram::DEFAULT_DIMENSIONS),
        ))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, ollama, trigram",
            config.provider
        ))),
    }
}

fn with_retries<P>(provider: P, max_retries: u32) -> Arc<dyn EmbeddingProvider>
where
    P: EmbeddingProvider + 'static,
{
    if max_retries == 0 {
        Arc::new(provider)
    } else {
        Arc::new(RetryingProvider::new(provider, max_retries))
    }
}
