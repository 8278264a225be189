//! Deterministic fake providers and fixtures shared by tests.

use crate::embeddings::EmbeddingProvider;
use crate::types::Document;
use async_trait::async_trait;
use harmony_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Document with the given title and embedding; other fields are fixed.
pub fn doc(title: &str, embedding: &[f32]) -> Document {
    Document {
        title: title.to_string(),
        author: "李白".to_string(),
        dynasty: "Tang".to_string(),
        content: format!("{}，床前明月光。", title),
        embedding: embedding.to_vec(),
    }
}

/// Returns a fixed vector per text (or a default) and counts calls.
#[derive(Debug, Default)]
pub struct FixedProvider {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedProvider {
    /// Every text embeds to `vector`.
    pub fn constant(vector: Vec<f32>) -> Self {
        Self {
            default: vector,
            ..Default::default()
        }
    }

    /// `text` embeds to `vector`; anything else embeds to the default.
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    async fn embed_batch(&self, texts: &[String], _model: &str) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(t).unwrap_or(&self.default).clone())
            .collect())
    }
}

/// Always fails, like a provider whose API is down.
#[derive(Debug)]
pub struct FailingProvider;

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn embed_batch(&self, _texts: &[String], _model: &str) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("HTTP 503: service unavailable".to_string()))
    }
}

/// Never answers.
#[derive(Debug)]
pub struct HangingProvider;

#[async_trait]
impl EmbeddingProvider for HangingProvider {
    fn provider_name(&self) -> &str {
        "hanging"
    }

    async fn embed_batch(&self, _texts: &[String], _model: &str) -> AppResult<Vec<Vec<f32>>> {
        std::future::pending().await
    }
}

/// Fails the first `failures` calls, then returns `vector` for every text.
#[derive(Debug)]
pub struct FlakyProvider {
    failures: usize,
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(failures: usize, vector: Vec<f32>) -> Self {
        Self {
            failures,
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn provider_name(&self) -> &str {
        "flaky"
    }

    async fn embed_batch(&self, texts: &[String], _model: &str) -> AppResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AppError::Embedding(format!("transient failure {}", call + 1)));
        }
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}
