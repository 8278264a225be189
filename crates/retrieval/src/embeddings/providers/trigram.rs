//! Trigram embedding provider using hashed character n-grams.

use crate::embeddings::provider::EmbeddingProvider;
use crate::similarity::normalize_in_place;
use harmony_core::{AppError, AppResult};
use std::collections::HashMap;

/// Default vector size for trigram embeddings.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// The only model identifier this provider answers to.
pub use harmony_core::config::TRIGRAM_MODEL;

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings from character unigrams, bigrams and
/// trigrams hashed into a fixed number of buckets. Classical Chinese has no
/// whitespace word boundaries, so n-grams run over characters rather than
/// words. Not semantically accurate like a neural model, but consistent and
/// content-dependent, which makes it useful for development and tests.
#[derive(Debug, Clone)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, gram: &[char]) -> usize {
        // FNV-1a over the code points; stable across platforms and runs
        let hash = gram.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, c| {
            (acc ^ (*c as u64)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }

    /// Generate an n-gram embedding for text.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let chars: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        let mut counts: HashMap<usize, u32> = HashMap::new();
        for n in 1..=3 {
            for gram in chars.windows(n) {
                *counts.entry(self.bucket(gram)).or_insert(0) += 1;
            }
        }

        for (idx, freq) in counts {
            embedding[idx] += (freq as f32).sqrt();
        }

        normalize_in_place(&mut embedding);
        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    async fn embed_batch(&self, texts: &[String], model: &str) -> AppResult<Vec<Vec<f32>>> {
        if model != TRIGRAM_MODEL {
            return Err(AppError::Embedding(format!(
                "Trigram provider only supports model '{}', got '{}'",
                TRIGRAM_MODEL, model
            )));
        }

        Ok(texts
            .iter()
            .map(|text| self.generate_embedding(text))
            .collect())
    }
}
