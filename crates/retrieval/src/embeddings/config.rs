//! Embedding configuration types.

use harmony_core::AppConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings needed to construct an embedding provider.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Expected embedding dimensions, when the provider lets us choose or check
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Endpoint override (base URL)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key; never serialized
    #[serde(skip)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries applied by the caller-level retry wrapper
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl EmbeddingConfig {
    /// Derive the embedding settings for the active provider.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model().to_string(),
            dimensions: config.provider_dimensions(&config.provider),
            endpoint: config.provider_endpoint(&config.provider),
            api_key: config.resolve_api_key(&config.provider),
            timeout_secs: config.provider_timeout_secs(&config.provider),
            max_retries: config.retrieval.max_retries,
        }
    }

    /// Request deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.provider = "trigram".to_string();
        app.retrieval.timeout_secs = 5;
        app.retrieval.max_retries = 0;

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 0);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_ollama_block_timeout_used() {
        let mut app = AppConfig::default();
        app.provider = "ollama".to_string();
        app.embedding = Some(harmony_core::config::EmbeddingSection {
            active_provider: "ollama".to_string(),
            providers: [(
                "ollama".to_string(),
                harmony_core::config::ProviderConfig::Ollama {
                    endpoint: "http://localhost:11434".to_string(),
                    model: "nomic-embed-text".to_string(),
                    timeout: Some(90),
                },
            )]
            .into_iter()
            .collect(),
        });

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_api_key_redacted() {
        let config = EmbeddingConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };

        assert!(!format!("{:?}", config).contains("sk-secret"));
        assert!(!serde_yaml::to_string(&config).unwrap().contains("sk-secret"));
    }
}
