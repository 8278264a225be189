//! Harmony CLI
//!
//! Main entry point for the harmony command-line tool.
//! Searches an embedded corpus of classical Chinese poems and builds it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ContextCommand, CorpusCommand, SearchCommand};
use harmony_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Harmony - semantic search over classical Chinese poetry
#[derive(Parser, Debug)]
#[command(name = "harmony")]
#[command(about = "Semantic search over classical Chinese poetry", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HARMONY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HARMONY_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the embedded poem corpus
    #[arg(long, global = true, env = "HARMONY_CORPUS")]
    corpus: Option<PathBuf>,

    /// Embedding provider (openai, ollama, trigram)
    #[arg(short, long, global = true, env = "HARMONY_PROVIDER")]
    provider: Option<String>,

    /// Embedding model identifier (must match the one the corpus was built with)
    #[arg(short, long, global = true, env = "HARMONY_MODEL")]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the poems most similar to a query
    Search(SearchCommand),

    /// Render retrieved poems as prompt context
    Context(ContextCommand),

    /// Build or inspect the embedded corpus
    Corpus(CorpusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration for the selected workspace
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.corpus,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Corpus: {:?}", config.corpus_path());
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model());

    let command_name = match &cli.command {
        Commands::Search(_) => "search",
        Commands::Context(_) => "context",
        Commands::Corpus(_) => "corpus",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Context(cmd) => cmd.execute(&config).await,
        Commands::Corpus(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
