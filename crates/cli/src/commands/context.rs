//! Context command handler.
//!
//! Prints the poem context a generation prompt would receive. When the
//! embedding provider is unavailable the command still succeeds and prints
//! nothing, mirroring how generation proceeds without retrieval.

use clap::Args;
use harmony_core::{config::AppConfig, AppError, AppResult};
use harmony_retrieval::context::{context_or_fallback, element_query};

/// Render retrieved poems as prompt context
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Query text (multiple words are joined with spaces)
    pub query: Vec<String>,

    /// Favourable Five Elements to build the query from (e.g. Water,Wood)
    #[arg(long, value_delimiter = ',', conflicts_with = "query")]
    pub elements: Vec<String>,

    /// Number of poems to include (default: retrieval.topK from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ContextCommand {
    fn query_text(&self) -> AppResult<String> {
        if !self.elements.is_empty() {
            return Ok(element_query(&self.elements));
        }
        if self.query.is_empty() {
            return Err(AppError::Config(
                "Provide a query or --elements".to_string(),
            ));
        }
        Ok(self.query.join(" "))
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;

        let query = self.query_text()?;
        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);

        tracing::info!("Executing context command (top_k={})", top_k);

        let retriever = harmony_retrieval::open_retriever(config)?;
        let context = context_or_fallback(&retriever, &query, top_k).await?;

        if self.json {
            let output = serde_json::json!({
                "query": query,
                "available": context.is_some(),
                "context": context.as_ref().map(|c| c.text.as_str()).unwrap_or(""),
                "poems": context.as_ref().map(|c| c.results.as_slice()).unwrap_or(&[]),
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", rendered);
        } else {
            match context {
                Some(context) if !context.text.is_empty() => println!("{}", context.text),
                Some(_) => eprintln!("No poems matched."),
                None => eprintln!("Embeddings unavailable; continuing without poem context."),
            }
        }

        Ok(())
    }
}
