//! Prompt context built from retrieved poems.
//!
//! Downstream generation treats retrieval as optional: when the embedding
//! provider is unavailable it proceeds without poem context instead of
//! failing the whole request.

use crate::error::RetrievalResult;
use crate::retriever::Retriever;
use crate::types::ScoredResult;
use serde::Serialize;
use tracing::warn;

/// Poems retrieved for a query, with their prompt rendering.
#[derive(Debug, Clone, Serialize)]
pub struct PoemContext {
    pub results: Vec<ScoredResult>,
    pub text: String,
}

/// Render results as numbered prompt lines, one poem per line.
///
/// ```
/// use harmony_retrieval::context::format_context;
/// use harmony_retrieval::ScoredResult;
///
/// let results = vec![ScoredResult {
///     title: "静夜思".to_string(),
///     author: "李白".to_string(),
///     dynasty: "Tang".to_string(),
///     content: "床前明月光，疑是地上霜。".to_string(),
///     score: 0.9,
/// }];
/// assert_eq!(
///     format_context(&results),
///     "[1] Title:《静夜思》 Author:李白 Content:床前明月光，疑是地上霜。"
/// );
/// ```
pub fn format_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] Title:《{}》 Author:{} Content:{}",
                i + 1,
                r.title,
                r.author,
                r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the retrieval query used for a set of favourable Five Elements.
pub fn element_query<S: AsRef<str>>(elements: &[S]) -> String {
    let joined = elements
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Chinese classical poetry and idioms related to {} elements",
        joined
    )
}

/// Search and render, falling back to no context when embeddings are down.
///
/// Returns `Ok(None)` only for [`crate::RetrievalError::EmbeddingUnavailable`];
/// every other error propagates. An empty result set is `Ok(Some(..))` with
/// empty text.
pub async fn context_or_fallback(
    retriever: &Retriever,
    query: &str,
    top_k: usize,
) -> RetrievalResult<Option<PoemContext>> {
    match retriever.search(query, top_k).await {
        Ok(results) => {
            let text = format_context(&results);
            Ok(Some(PoemContext { results, text }))
        }
        Err(e) if e.is_embedding_unavailable() => {
            warn!("Retrieval failed, continuing without poem context: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusStore;
    use crate::error::RetrievalError;
    use crate::tests::support::{doc, FailingProvider, FixedProvider};
    use std::sync::Arc;

    fn scored(title: &str, author: &str, content: &str) -> ScoredResult {
        ScoredResult {
            title: title.to_string(),
            author: author.to_string(),
            dynasty: "Tang".to_string(),
            content: content.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_format_numbers_lines() {
        let text = format_context(&[
            scored("登鹳雀楼", "王之涣", "白日依山尽"),
            scored("春晓", "孟浩然", "春眠不觉晓"),
        ]);

        assert_eq!(
            text,
            "[1] Title:《登鹳雀楼》 Author:王之涣 Content:白日依山尽\n\
             [2] Title:《春晓》 Author:孟浩然 Content:春眠不觉晓"
        );
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_element_query() {
        assert_eq!(
            element_query(&["Water", "Wood"]),
            "Chinese classical poetry and idioms related to Water Wood elements"
        );
    }

    #[tokio::test]
    async fn test_fallback_on_provider_failure() {
        let corpus = Arc::new(CorpusStore::from_documents(vec![doc("a", &[1.0, 0.0])]).unwrap());
        let retriever = Retriever::new(Arc::new(FailingProvider), corpus, "fake-model").unwrap();

        let context = context_or_fallback(&retriever, "water", 5).await.unwrap();
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn test_invalid_query_propagates() {
        let corpus = Arc::new(CorpusStore::from_documents(vec![doc("a", &[1.0, 0.0])]).unwrap());
        let retriever = Retriever::new(
            Arc::new(FixedProvider::constant(vec![1.0, 0.0])),
            corpus,
            "fake-model",
        )
        .unwrap();

        let err = context_or_fallback(&retriever, " ", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_context_rendered() {
        let corpus = Arc::new(
            CorpusStore::from_documents(vec![doc("a", &[1.0, 0.0]), doc("b", &[0.0, 1.0])])
                .unwrap(),
        );
        let retriever = Retriever::new(
            Arc::new(FixedProvider::constant(vec![0.0, 1.0])),
            corpus,
            "fake-model",
        )
        .unwrap();

        let context = context_or_fallback(&retriever, "wood", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.results.len(), 1);
        assert!(context.text.starts_with("[1] Title:《b》"));
    }
}
