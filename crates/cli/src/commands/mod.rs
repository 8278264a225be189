//! Command handlers for the Harmony CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod context;
pub mod corpus;
pub mod search;

// Re-export command types for convenience
pub use context::ContextCommand;
pub use corpus::CorpusCommand;
pub use search::SearchCommand;
