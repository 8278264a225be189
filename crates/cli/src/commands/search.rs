//! Search command handler.

use clap::Args;
use harmony_core::{config::AppConfig, AppError, AppResult};
use harmony_retrieval::ScoredResult;

/// Find the poems most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text (multiple words are joined with spaces)
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of poems to return (default: retrieval.topK from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;

        let query = self.query.join(" ");
        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);

        tracing::info!("Executing search command (top_k={})", top_k);

        let retriever = harmony_retrieval::open_retriever(config)?;
        let results = retriever.search(&query, top_k).await?;

        if self.json {
            let output = serde_json::to_string_pretty(&results)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", output);
        } else {
            print!("{}", render(&results));
        }

        Ok(())
    }
}

fn render(results: &[ScoredResult]) -> String {
    if results.is_empty() {
        return "No poems found.\n".to_string();
    }

    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. 《{}》 {} ({}) score {:.4}\n   {}\n",
            i + 1,
            r.title,
            r.author,
            r.dynasty,
            r.score,
            r.content
        ));
    }
    out
}
