//! Hypothetical Document Embeddings.
//!
//! The query is never embedded. A generator first writes a document that
//! plausibly answers it, and that document's embedding is matched against a
//! cosine index of corpus chunks. Scores come back as confidences in `[0, 1]`.

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use localrag_core::chunker::{Chunker, ChunkingConfig};
use localrag_core::error::{Error, Result};
use localrag_core::traits::{DocumentSource, Embedder, Generator};
use localrag_core::types::{Chunk, Metric, RetrievalResult, ScoreKind, ScoredChunk};
use localrag_vector::{rescale_cosine, VectorIndex};

use crate::retriever::{check_dim, embed_chunks, embed_one};

/// Model identifiers carried for logging; the instances themselves are injected.
#[derive(Debug, Clone, Default)]
pub struct ModelIds {
    pub generator: String,
    pub embedder: String,
}

pub struct HydeRetriever {
    generator: Arc<dyn Generator>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    index: VectorIndex<Chunk>,
    models: ModelIds,
}

impl HydeRetriever {
    /// Load the corpus at `location`, chunk it and index the chunks.
    pub fn new(
        source: &dyn DocumentSource,
        location: &Path,
        chunking: ChunkingConfig,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        models: ModelIds,
    ) -> Result<Self> {
        let texts = source.load(location)?;
        info!(path = %location.display(), documents = texts.len(), "loaded HyDE corpus");
        Self::from_texts(&texts, chunking, generator, embedder, models)
            .map_err(|e| match e {
                Error::EmptyCorpus(_) => Error::EmptyCorpus(format!("{} yielded no chunks", location.display())),
                other => other,
            })
    }

    pub fn from_texts<S: AsRef<str>>(
        texts: &[S],
        chunking: ChunkingConfig,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        models: ModelIds,
    ) -> Result<Self> {
        let chunks = Chunker::from_config(chunking)?.chunk(texts);
        Self::from_chunks(chunks, chunking, generator, embedder, models)
    }

    pub fn from_chunks(
        chunks: Vec<Chunk>,
        chunking: ChunkingConfig,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        models: ModelIds,
    ) -> Result<Self> {
        chunking.validate()?;
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus("corpus yielded no chunks".into()));
        }
        let vectors = embed_chunks(embedder.as_ref(), &chunks)?;
        let mut index = VectorIndex::new(Metric::Cosine);
        index.build(vectors, chunks)?;
        info!(chunks = index.len(), generator = %models.generator, embedder = %models.embedder, "HyDE index built");
        Ok(Self { generator, embedder, chunking, index, models })
    }

    /// Wrap a cosine index restored from a snapshot.
    pub fn from_index(
        index: VectorIndex<Chunk>,
        chunking: ChunkingConfig,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        models: ModelIds,
    ) -> Result<Self> {
        chunking.validate()?;
        if index.metric() != Metric::Cosine {
            return Err(Error::InvalidConfig(format!("HyDE needs a cosine index, got {}", index.metric())));
        }
        if index.is_empty() {
            return Err(Error::EmptyCorpus("snapshot holds no chunks".into()));
        }
        check_dim(embedder.as_ref(), &index)?;
        Ok(Self { generator, embedder, chunking, index, models })
    }

    pub fn index(&self) -> &VectorIndex<Chunk> { &self.index }

    pub fn chunking(&self) -> ChunkingConfig { self.chunking }

    pub fn prompt(&self, query: &str) -> String {
        format!(
            "Generate a comprehensive hypothetical document that answers the following question.\n\
             The document should be written in a formal academic style and be approximately {} characters long.\n\n\
             Question: {}\n\n\
             Hypothetical Document:",
            self.chunking.chunk_size, query
        )
    }

    /// One generator call with a token budget of `chunk_size`. Empty output
    /// counts as a failure.
    pub fn generate_hypothetical_document(&self, query: &str) -> Result<String> {
        let doc = self
            .generator
            .generate(&self.prompt(query), self.chunking.chunk_size)
            .map_err(Error::Generation)?;
        if doc.trim().is_empty() {
            return Err(Error::Generation(anyhow!("generator returned an empty hypothetical document")));
        }
        debug!(model = %self.models.generator, chars = doc.chars().count(), "hypothetical document generated");
        Ok(doc)
    }

    /// Top `min(k, chunks)` chunks for `query` plus the hypothetical document
    /// that was used to find them.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<(RetrievalResult, String)> {
        if query.trim().is_empty() {
            return Err(Error::InvalidConfig("query must not be empty".into()));
        }
        // 1) hypothesize
        let doc = self.generate_hypothetical_document(query).map_err(Error::retrieval)?;
        // 2) embed the hypothesis; the index normalizes it
        let vector = embed_one(self.embedder.as_ref(), &doc).map_err(Error::retrieval)?;
        // 3) search
        let hits = self.index.search_payloads(&vector, k).map_err(Error::retrieval)?;
        // 4) rescale to [0, 1]
        let hits: Vec<ScoredChunk> = hits
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk: chunk.clone(), score: rescale_cosine(score) })
            .collect();
        debug!(k, returned = hits.len(), "HyDE retrieval");
        Ok((RetrievalResult::new(ScoreKind::Confidence, hits), doc))
    }
}
