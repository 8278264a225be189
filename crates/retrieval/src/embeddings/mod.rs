//! Embedding providers.
//!
//! Provider-agnostic text embedding with a configurable backend and an
//! optional retry wrapper for remote APIs.

pub mod config;
pub mod provider;
pub mod providers;
pub mod retry;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
pub use retry::RetryingProvider;
