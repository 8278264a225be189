//! Ranking scenarios against the full retriever.

use super::support::{doc, FailingProvider, FixedProvider, HangingProvider};
use crate::corpus::CorpusStore;
use crate::error::RetrievalError;
use crate::retriever::Retriever;
use crate::types::Document;
use std::sync::Arc;
use std::time::Duration;

const QUERY: &str = "water and wood";

fn three_docs() -> Vec<Document> {
    vec![
        doc("east", &[1.0, 0.0]),
        doc("north", &[0.0, 1.0]),
        doc("between", &[0.7, 0.7]),
    ]
}

fn setup(docs: Vec<Document>, provider: FixedProvider) -> (Retriever, Arc<FixedProvider>) {
    let provider = Arc::new(provider);
    let corpus = Arc::new(CorpusStore::from_documents(docs).unwrap());
    let retriever = Retriever::new(provider.clone(), corpus, "fake-model").unwrap();
    (retriever, provider)
}

fn titles(results: &[crate::types::ScoredResult]) -> Vec<&str> {
    results.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn test_ranks_by_cosine_similarity() {
    let (retriever, provider) = setup(three_docs(), FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 3).await.unwrap();

    assert_eq!(titles(&results), vec!["east", "between", "north"]);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!((results[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    assert_eq!(results[2].score, 0.0);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_top_k_truncates() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 2).await.unwrap();

    assert_eq!(titles(&results), vec!["east", "between"]);
}

#[tokio::test]
async fn test_top_k_larger_than_corpus() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 10).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_empty_corpus_returns_nothing_without_calling_provider() {
    let (retriever, provider) = setup(Vec::new(), FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 5).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_query_text_selects_vector() {
    let provider = FixedProvider::constant(vec![1.0, 0.0]).with("north wind", vec![0.0, 1.0]);
    let (retriever, _) = setup(three_docs(), provider);

    let results = retriever.search("north wind", 1).await.unwrap();

    assert_eq!(titles(&results), vec!["north"]);
}

#[tokio::test]
async fn test_ties_keep_corpus_order() {
    let docs = vec![
        doc("first", &[1.0, 0.0]),
        doc("second", &[2.0, 0.0]),
        doc("other", &[0.0, 1.0]),
        doc("third", &[0.5, 0.0]),
    ];
    let (retriever, _) = setup(docs, FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 4).await.unwrap();

    assert_eq!(titles(&results), vec!["first", "second", "third", "other"]);
}

#[tokio::test]
async fn test_zero_vector_scores_zero() {
    let docs = vec![doc("empty", &[0.0, 0.0]), doc("east", &[1.0, 0.0])];
    let (retriever, _) = setup(docs, FixedProvider::constant(vec![1.0, 0.0]));

    let results = retriever.search(QUERY, 2).await.unwrap();

    assert_eq!(titles(&results), vec!["east", "empty"]);
    assert_eq!(results[1].score, 0.0);
    assert!(!results[1].score.is_nan());
}

#[tokio::test]
async fn test_zero_query_vector_scores_zero() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![0.0, 0.0]));

    let results = retriever.search(QUERY, 3).await.unwrap();

    assert!(results.iter().all(|r| r.score == 0.0));
    assert_eq!(titles(&results), vec!["east", "north", "between"]);
}

#[test]
fn test_scoring_is_bit_identical_on_repeat() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![0.3, 0.9]));

    let first = retriever.score_all(&[0.3, 0.9]).unwrap();
    let second = retriever.score_all(&[0.3, 0.9]).unwrap();

    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[tokio::test]
async fn test_provider_failure_is_embedding_unavailable() {
    let corpus = Arc::new(CorpusStore::from_documents(three_docs()).unwrap());
    let retriever = Retriever::new(Arc::new(FailingProvider), corpus, "fake-model").unwrap();

    let err = retriever.search(QUERY, 3).await.unwrap_err();

    match err {
        RetrievalError::EmbeddingUnavailable { provider, reason } => {
            assert_eq!(provider, "failing");
            assert!(reason.contains("503"));
        }
        other => panic!("expected EmbeddingUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_timeout_is_embedding_unavailable() {
    let corpus = Arc::new(CorpusStore::from_documents(three_docs()).unwrap());
    let retriever = Retriever::new(Arc::new(HangingProvider), corpus, "fake-model")
        .unwrap()
        .with_timeout(Duration::from_millis(20));

    let err = retriever.search(QUERY, 3).await.unwrap_err();

    assert!(err.is_embedding_unavailable());
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_wrong_query_dimension_is_embedding_unavailable() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![1.0, 0.0, 0.0]));

    let err = retriever.search(QUERY, 3).await.unwrap_err();

    assert!(err.is_embedding_unavailable());
    assert!(err.to_string().contains("3 dimensions"));
}

#[tokio::test]
async fn test_non_finite_query_is_embedding_unavailable() {
    let (retriever, _) = setup(three_docs(), FixedProvider::constant(vec![f32::NAN, 0.0]));

    let err = retriever.search(QUERY, 3).await.unwrap_err();

    assert!(err.is_embedding_unavailable());
}

#[tokio::test]
async fn test_concurrent_searches_share_corpus() {
    let (retriever, provider) = setup(three_docs(), FixedProvider::constant(vec![1.0, 0.0]));
    let retriever = Arc::new(retriever);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = Arc::clone(&retriever);
            tokio::spawn(async move { retriever.search(QUERY, 2).await })
        })
        .collect();

    for handle in handles {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(titles(&results), vec!["east", "between"]);
    }
    assert_eq!(provider.calls(), 8);
}

#[tokio::test]
async fn test_dropped_search_never_returns_results() {
    let corpus = Arc::new(CorpusStore::from_documents(three_docs()).unwrap());
    let retriever = Retriever::new(Arc::new(HangingProvider), corpus, "fake-model").unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(20), retriever.search(QUERY, 3)).await;

    assert!(outcome.is_err());
}
