mod common;

use common::{embedder, PARIS, LONDON};
use localrag_core::error::Error;
use localrag_core::types::{Chunk, Metric, ScoreKind};
use localrag_retrieve::{Retriever, RetrievalStrategy, StrategyKind};
use localrag_vector::VectorIndex;

#[test]
fn capital_of_france_finds_paris() {
    let mut retriever = Retriever::new(embedder());
    retriever.build_index(&[PARIS, LONDON]).unwrap();
    let result = retriever.retrieve("What is the capital of France?", 1).unwrap();
    assert_eq!(result.kind, ScoreKind::SquaredL2);
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits[0].chunk.text, PARIS);
    assert_eq!(result.hits[0].chunk.source_index, 0);
}

#[test]
fn one_sentence_corpus_answers_with_the_matching_capital() {
    let corpus = ["Paris is the capital of France.", "London is the capital of the UK."];
    let mut retriever = Retriever::new(embedder());
    retriever.build_index(&corpus).unwrap();
    let result = retriever.retrieve("What is the capital of France?", 1).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits[0].chunk.text, "Paris is the capital of France.");
    assert_eq!(result.hits[0].chunk.source_index, 0);
}

#[test]
fn distances_ascend_and_k_is_capped() {
    let mut retriever = Retriever::new(embedder());
    retriever.build_index(&[PARIS, LONDON]).unwrap();
    let result = retriever.retrieve("What is the capital of France?", 10).unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.hits[0].score <= result.hits[1].score);
    assert!(result.hits.iter().all(|h| h.score >= 0.0));
}

#[test]
fn retrieve_before_build_is_not_built() {
    let retriever = Retriever::new(embedder());
    assert!(!retriever.is_built());
    assert!(matches!(retriever.retrieve("anything", 1), Err(Error::NotBuilt)));
}

#[test]
fn empty_document_list_builds_an_empty_index() {
    let mut retriever = Retriever::new(embedder());
    retriever.build_index::<&str>(&[]).unwrap();
    assert!(matches!(retriever.retrieve("anything", 1), Err(Error::EmptyIndex)));
}

#[test]
fn from_index_rejects_cosine_and_wrong_dims() {
    let mut cosine = VectorIndex::new(Metric::Cosine);
    cosine.build(vec![vec![1.0; common::DIM]], vec![Chunk::new("x", 0, 0)]).unwrap();
    assert!(matches!(Retriever::from_index(embedder(), cosine), Err(Error::InvalidConfig(_))));

    let mut small = VectorIndex::new(Metric::L2);
    small.build(vec![vec![1.0, 0.0]], vec![Chunk::new("x", 0, 0)]).unwrap();
    assert!(matches!(Retriever::from_index(embedder(), small), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn direct_strategy_has_no_hypothetical_document() {
    let mut retriever = Retriever::new(embedder());
    retriever.build_index(&[PARIS, LONDON]).unwrap();
    let strategy = RetrievalStrategy::from(retriever);
    assert_eq!(strategy.kind(), StrategyKind::Direct);
    let retrieval = strategy.retrieve("What is the capital of France?", 1).unwrap();
    assert!(retrieval.hypothetical_document.is_none());
    assert_eq!(retrieval.result.hits[0].chunk.text, PARIS);
}
