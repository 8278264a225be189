//! Configuration management for Harmony.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Config files (.harmony/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric: the default
//! corpus and config file both live under `.harmony/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers known to the retrieval library.
pub const KNOWN_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Environment variable consulted for OpenAI keys when no `apiKeyEnv` is configured.
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// The only model the offline trigram provider understands.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

/// Highest accepted `retrieval.maxRetries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Model used by a provider when none is configured.
pub fn default_model(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("text-embedding-3-small"),
        "ollama" => Some("nomic-embed-text"),
        "trigram" => Some(TRIGRAM_MODEL),
        _ => None,
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .harmony/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Corpus file override; `None` means `.harmony/corpus.json`
    pub corpus: Option<PathBuf>,

    /// Active embedding provider ("openai", "ollama", "trigram")
    pub provider: String,

    /// Embedding model identifier; `None` falls back to the provider's default.
    /// Must match the model the corpus was built with.
    pub model: Option<String>,

    /// API key for the embedding provider
    pub api_key: Option<String>,

    /// Retrieval tuning
    pub retrieval: RetrievalSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding provider configurations from config.yaml
    pub embedding: Option<EmbeddingSection>,
}

/// Retrieval settings shared by the CLI commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Default number of poems returned by a search
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Deadline for a single embedding request, in seconds
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,

    /// Attempts made by the caller-level retry wrapper after the first failure
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Embedding configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        dimensions: Option<usize>,
    },
    Ollama {
        endpoint: String,
        model: String,
        /// Request timeout in seconds; overrides `retrieval.timeoutSecs`
        timeout: Option<u64>,
    },
    Trigram {
        dimensions: usize,
        model: Option<String>,
    },
}

impl ProviderConfig {
    fn model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => {
                Some(model)
            }
            ProviderConfig::Trigram { model, .. } => model.as_deref(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    embedding: Option<EmbeddingSection>,
    retrieval: Option<RetrievalFileSection>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalFileSection {
    corpus: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<usize>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
    #[serde(rename = "maxRetries")]
    max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            corpus: None,
            provider: "openai".to_string(),
            model: None,
            api_key: None,
            retrieval: RetrievalSettings::default(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
            embedding: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `HARMONY_WORKSPACE`: Override workspace path
    /// - `HARMONY_CONFIG`: Path to config file
    /// - `HARMONY_CORPUS`: Path to the embedded poem corpus
    /// - `HARMONY_PROVIDER`: Embedding provider
    /// - `HARMONY_MODEL`: Embedding model identifier
    /// - `HARMONY_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use harmony_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus: {:?}", config.corpus_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but with the workspace and config file
    /// chosen up front so the right YAML file gets merged.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("HARMONY_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("HARMONY_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.harmony_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(corpus) = std::env::var("HARMONY_CORPUS") {
            config.corpus = Some(PathBuf::from(corpus));
        }

        if let Ok(provider) = std::env::var("HARMONY_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("HARMONY_MODEL") {
            config.model = Some(model);
        }

        if let Ok(key) = std::env::var("HARMONY_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            if let Some(corpus) = retrieval.corpus {
                result.corpus = Some(PathBuf::from(corpus));
            }
            if let Some(top_k) = retrieval.top_k {
                result.retrieval.top_k = top_k;
            }
            if let Some(timeout_secs) = retrieval.timeout_secs {
                result.retrieval.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = retrieval.max_retries {
                result.retrieval.max_retries = max_retries;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.provider = embedding.active_provider.clone();

            if let Some(model) = embedding
                .providers
                .get(&embedding.active_provider)
                .and_then(ProviderConfig::model)
            {
                result.model = Some(model.to_string());
            }

            result.embedding = Some(embedding);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        corpus: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(corpus) = corpus {
            self.corpus = Some(corpus);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .harmony directory.
    pub fn harmony_dir(&self) -> PathBuf {
        self.workspace.join(".harmony")
    }

    /// The effective embedding model: the configured one, else the active
    /// provider's default. Empty for an unknown provider with no model set.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .or_else(|| default_model(&self.provider))
            .unwrap_or("")
    }

    /// Resolve the corpus file, relative paths being taken from the workspace.
    pub fn corpus_path(&self) -> PathBuf {
        match &self.corpus {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.harmony_dir().join("corpus.json"),
        }
    }

    /// Get the configuration block for a provider, if the config file has one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.embedding
            .as_ref()
            .and_then(|section| section.providers.get(provider))
    }

    /// Endpoint override for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.clone(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.clone()),
            ProviderConfig::Trigram { .. } => None,
        }
    }

    /// Expected vector dimensionality for a provider, if configured.
    pub fn provider_dimensions(&self, provider: &str) -> Option<usize> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { dimensions, .. } => *dimensions,
            ProviderConfig::Trigram { dimensions, .. } => Some(*dimensions),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Request timeout in seconds for a provider: its own setting if it has
    /// one, else `retrieval.timeoutSecs`.
    pub fn provider_timeout_secs(&self, provider: &str) -> u64 {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::Ollama {
                timeout: Some(secs),
                ..
            }) => *secs,
            _ => self.retrieval.timeout_secs,
        }
    }

    /// Resolve API key from explicit settings or the provider's environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.as_str(),
            _ if provider == "openai" => DEFAULT_OPENAI_KEY_ENV,
            _ => return None,
        };

        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let model = self.model();
        if model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model identifier must not be empty".to_string(),
            ));
        }

        if provider == "trigram" && model != TRIGRAM_MODEL {
            return Err(AppError::Config(format!(
                "Trigram provider only supports model '{}', got '{}'",
                TRIGRAM_MODEL, model
            )));
        }

        if self.retrieval.timeout_secs == 0 || self.provider_timeout_secs(provider) == 0 {
            return Err(AppError::Config(
                "Embedding timeout must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.max_retries > MAX_RETRIES_LIMIT {
            return Err(AppError::Config(format!(
                "retrieval.maxRetries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.retrieval.max_retries
            )));
        }

        if provider == "openai" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.clone(),
                _ => DEFAULT_OPENAI_KEY_ENV.to_string(),
            };
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        Ok(())
    }
}
