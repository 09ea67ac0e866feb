//! localrag-retrieve
//!
//! Retrieval strategies over [`localrag_vector::VectorIndex`]: direct
//! query embedding ([`Retriever`]) and hypothetical document embeddings
//! ([`HydeRetriever`]), plus answer synthesis and the self-evaluating
//! [`SelfRag`] loop.

pub mod hyde;
pub mod retriever;
pub mod self_rag;
pub mod strategy;
pub mod synth;

pub use hyde::{HydeRetriever, ModelIds};
pub use retriever::Retriever;
pub use self_rag::{AspectScore, Evaluation, EvaluationError, SelfRag, SelfRagError, SelfRagOptions, SelfRagResponse};
pub use strategy::{Retrieval, RetrievalStrategy, StrategyKind};
pub use synth::AnswerSynthesizer;
