use std::path::Path;

use crate::error::Result;

/// Maps text to fixed-dimension vectors. Batched; deterministic for a fixed
/// model and input.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Produces text for a prompt. Output may be non-deterministic.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> anyhow::Result<String>;
}

/// Yields the raw text blobs stored at a corpus location, in a stable order.
pub trait DocumentSource: Send + Sync {
    fn load(&self, location: &Path) -> Result<Vec<String>>;
}
