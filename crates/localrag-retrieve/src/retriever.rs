use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use localrag_core::error::{Error, Result};
use localrag_core::traits::Embedder;
use localrag_core::types::{Chunk, Metric, RetrievalResult, ScoredChunk};
use localrag_vector::VectorIndex;

/// Direct query-to-document retrieval over an L2 index. Scores are squared
/// Euclidean distances, smallest first.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Option<VectorIndex<Chunk>>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self { Self { embedder, index: None } }

    /// Wrap an already built L2 index, e.g. one restored from a snapshot.
    pub fn from_index(embedder: Arc<dyn Embedder>, index: VectorIndex<Chunk>) -> Result<Self> {
        if index.metric() != Metric::L2 {
            return Err(Error::InvalidConfig(format!("direct retrieval needs an l2 index, got {}", index.metric())));
        }
        check_dim(embedder.as_ref(), &index)?;
        Ok(Self { embedder, index: Some(index) })
    }

    pub fn is_built(&self) -> bool { self.index.is_some() }

    pub fn index(&self) -> Option<&VectorIndex<Chunk>> { self.index.as_ref() }

    /// Index whole documents, one entry each, with a single batched embedder call.
    pub fn build_index<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        let chunks = documents.iter().enumerate().map(|(i, d)| Chunk::new(d.as_ref(), i, 0)).collect();
        self.build_from_chunks(chunks)
    }

    pub fn build_from_chunks(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        let vectors = embed_chunks(self.embedder.as_ref(), &chunks)?;
        let mut index = VectorIndex::new(Metric::L2);
        index.build(vectors, chunks)?;
        info!(entries = index.len(), "direct retriever index built");
        self.index = Some(index);
        Ok(())
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let index = self.index.as_ref().ok_or(Error::NotBuilt)?;
        let query_vec = embed_one(self.embedder.as_ref(), query)?;
        let hits: Vec<ScoredChunk> = index
            .search_payloads(&query_vec, top_k)?
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk: chunk.clone(), score })
            .collect();
        debug!(top_k, returned = hits.len(), "direct retrieval");
        Ok(RetrievalResult::new(index.metric().score_kind(), hits))
    }
}

pub(crate) fn embed_chunks(embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
    if chunks.is_empty() { return Ok(Vec::new()); }
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
    if vectors.len() != texts.len() {
        return Err(Error::Embedding(anyhow!("embedder returned {} vectors for {} texts", vectors.len(), texts.len())));
    }
    Ok(vectors)
}

pub(crate) fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed_batch(&[text.to_string()])
        .map_err(Error::Embedding)?
        .pop()
        .ok_or_else(|| Error::Embedding(anyhow!("embedder returned no vector")))
}

pub(crate) fn check_dim(embedder: &dyn Embedder, index: &VectorIndex<Chunk>) -> Result<()> {
    match index.dim() {
        Some(dim) if dim != embedder.dim() => Err(Error::DimensionMismatch { what: "embedder", expected: dim, actual: embedder.dim() }),
        _ => Ok(()),
    }
}
