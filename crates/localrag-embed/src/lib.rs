//! localrag-embed
//!
//! Embedders behind [`localrag_core::Embedder`]: the BGE-M3 model running on
//! candle, and a hashing embedder for tests and offline development.

mod bge;
pub mod pool;

use anyhow::Result;
use std::hash::{Hash, Hasher};

use tracing::info;
use twox_hash::XxHash64;

use localrag_core::traits::Embedder;

pub use bge::{BgeM3Embedder, BGE_M3_DIM};
pub use pool::mean_pool_l2;

/// Deterministic bag-of-words embedder: each lowercased alphanumeric token adds
/// one to a hashed bucket, then the vector is L2-normalized. Texts without any
/// token map to the zero vector.
pub struct HashEmbedder { dim: usize }

impl HashEmbedder {
    /// A zero `dim` is raised to one bucket.
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase)
}

pub fn get_default_embedder() -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake { info!("Using HashEmbedder"); return Ok(Box::new(HashEmbedder::new(BGE_M3_DIM))); }
    Ok(Box::new(BgeM3Embedder::new()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_lowercased_and_split_on_punctuation() {
        let t: Vec<String> = tokens("What is the capital of France?").collect();
        assert_eq!(t, vec!["what", "is", "the", "capital", "of", "france"]);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::new(16).embed_text("  ... ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dim_is_clamped_to_one_bucket() {
        let e = HashEmbedder::new(0);
        assert_eq!(e.dim(), 1);
        assert_eq!(e.embed_text("Paris Paris"), vec![1.0]);
    }
}
