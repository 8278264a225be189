//! OpenAI Embedding Provider
//!
//! Calls the OpenAI embeddings API (`POST /v1/embeddings`). The same model
//! that embedded the corpus (by default `text-embedding-3-small`) must be
//! used for queries, so the model is supplied per call.
//!
//! # Example
//! ```no_run
//! use harmony_retrieval::embeddings::EmbeddingProvider;
//! use harmony_retrieval::embeddings::providers::OpenAiProvider;
//! use std::time::Duration;
//!
//! # async fn example() -> harmony_core::AppResult<()> {
//! let provider = OpenAiProvider::new("sk-...", None, Duration::from_secs(30), None)?;
//! let embedding = provider.embed("山水之间", "text-embedding-3-small").await?;
//! assert_eq!(embedding.len(), 1536);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use harmony_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// OpenAI API base URL
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const EMBEDDING_ENDPOINT: &str = "/embeddings";

/// Embedding provider backed by the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    /// Requested output size (Matryoshka truncation), if any
    dimensions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiProvider {
    /// Create a provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `endpoint` - Base URL override (defaults to `https://api.openai.com/v1`)
    /// * `timeout` - Per-request timeout
    /// * `dimensions` - Optional output dimensionality to request
    pub fn new(
        api_key: &str,
        endpoint: Option<&str>,
        timeout: Duration,
        dimensions: Option<usize>,
    ) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "OpenAI API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for OpenAI: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            dimensions,
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %model))]
    async fn embed_batch(&self, texts: &[String], model: &str) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model,
            input: texts,
            encoding_format: "float",
            dimensions: self.dimensions,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!("OpenAI API error ({}): {}", status, detail);
            return Err(AppError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, detail
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        if data.iter().enumerate().any(|(i, d)| d.index != i) {
            return Err(AppError::Embedding(
                "OpenAI response indices do not cover every input exactly once".to_string(),
            ));
        }

        debug!("Received {} embeddings", data.len());

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
