//! Corpus command handler.
//!
//! Builds the embedded poem corpus from raw sources and reports on it.

use clap::{Args, Subcommand};
use harmony_core::{config::AppConfig, AppError, AppResult};
use harmony_retrieval::builder::DEFAULT_MIN_CHARS;
use harmony_retrieval::{BuildOptions, SourceSpec};
use std::path::PathBuf;

/// Build or inspect the embedded corpus
#[derive(Args, Debug)]
pub struct CorpusCommand {
    #[command(subcommand)]
    pub action: CorpusAction,
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// Embed raw poem sources into a corpus file
    Build(CorpusBuildCommand),
    /// Show corpus statistics
    Stats(CorpusStatsCommand),
}

/// Embed raw poem sources
#[derive(Args, Debug)]
pub struct CorpusBuildCommand {
    /// Source file or directory, optionally tagged: [TAG=]PATH (e.g. Tang=data/tang.json)
    #[arg(long, required = true)]
    pub source: Vec<SourceSpec>,

    /// Output corpus path (default: the configured corpus)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep at most this many records per source
    #[arg(long)]
    pub limit: Option<usize>,

    /// Drop poems with this many characters or fewer
    #[arg(long, default_value_t = DEFAULT_MIN_CHARS)]
    pub min_chars: usize,

    /// Texts per embedding request
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Embedding requests in flight at once
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;

        tracing::info!(
            "Executing corpus build command ({} sources)",
            self.source.len()
        );

        let mut config = config.clone();
        if let Some(output) = &self.output {
            config.corpus = Some(output.clone());
        }

        let options = BuildOptions {
            sources: self.source.clone(),
            limit: self.limit,
            min_chars: self.min_chars,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
        };

        let (stats, manifest) = harmony_retrieval::build(&config, &options).await?;

        if self.json {
            let output = serde_json::json!({
                "corpus": config.corpus_path(),
                "files": stats.files,
                "records": stats.records,
                "skipped": stats.skipped,
                "documents": stats.documents,
                "dimensions": stats.dimensions,
                "model": manifest.model,
                "sha256": manifest.sha256,
                "durationSecs": stats.duration_secs,
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", rendered);
        } else {
            println!(
                "Built {} poems from {} files ({} skipped) in {:.2}s",
                stats.documents, stats.files, stats.skipped, stats.duration_secs
            );
            println!(
                "  Corpus: {}",
                config.corpus_path().display()
            );
            println!(
                "  Model: {} ({} dimensions)",
                manifest.model, manifest.dimensions
            );
        }

        Ok(())
    }
}

/// Show corpus statistics
#[derive(Args, Debug)]
pub struct CorpusStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing corpus stats command");

        let stats = harmony_retrieval::corpus_stats(config)?;

        if self.json {
            let rendered = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", rendered);
        } else {
            println!("Corpus: {}", config.corpus_path().display());
            println!("  Documents: {}", stats.documents);
            match stats.dimensions {
                Some(d) => println!("  Dimensions: {}", d),
                None => println!("  Dimensions: n/a"),
            }
            println!(
                "  Model: {}",
                stats.model.as_deref().unwrap_or("unknown (no manifest)")
            );
            for (dynasty, count) in &stats.dynasties {
                println!("  {}: {}", dynasty, count);
            }
        }

        Ok(())
    }
}

impl CorpusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            CorpusAction::Build(cmd) => cmd.execute(config).await,
            CorpusAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}
