//! Domain types shared by the chunker, the vector index and the retrievers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type EmbeddingVector = Vec<f32>;

/// A bounded slice of a source text, the atomic retrievable unit.
///
/// - `text`: the trimmed window content
/// - `source_index`: position of the originating text in the chunker input
/// - `source_offset`: character offset of the window start in that text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_index: usize,
    pub source_offset: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_index: usize, source_offset: usize) -> Self {
        Self { text: text.into(), source_index, source_offset }
    }
}

/// Similarity metric of one index instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance, lower is better.
    L2,
    /// Inner product of L2-normalized vectors, higher is better.
    Cosine,
}

impl Metric {
    pub fn higher_is_better(self) -> bool { matches!(self, Metric::Cosine) }

    pub fn score_kind(self) -> ScoreKind {
        match self {
            Metric::L2 => ScoreKind::SquaredL2,
            Metric::Cosine => ScoreKind::Cosine,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::L2),
            "cosine" | "ip" | "inner_product" => Ok(Metric::Cosine),
            other => Err(Error::InvalidConfig(format!("unknown metric '{other}'"))),
        }
    }
}

/// What a score in a [`RetrievalResult`] means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Raw squared L2 distance, ascending.
    SquaredL2,
    /// Raw cosine similarity in `[-1, 1]`, descending.
    Cosine,
    /// Cosine similarity rescaled to `[0, 1]`, descending.
    Confidence,
}

impl ScoreKind {
    pub fn higher_is_better(self) -> bool { !matches!(self, ScoreKind::SquaredL2) }

    pub fn label(self) -> &'static str {
        match self {
            ScoreKind::SquaredL2 => "distance",
            ScoreKind::Cosine => "similarity",
            ScoreKind::Confidence => "confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ranked chunks, best first according to `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub kind: ScoreKind,
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(kind: ScoreKind, hits: Vec<ScoredChunk>) -> Self { Self { kind, hits } }

    pub fn len(&self) -> usize { self.hits.len() }

    pub fn is_empty(&self) -> bool { self.hits.is_empty() }

    pub fn top(&self) -> Option<&ScoredChunk> { self.hits.first() }

    pub fn texts(&self) -> impl Iterator<Item = &str> { self.hits.iter().map(|h| h.chunk.text.as_str()) }
}
