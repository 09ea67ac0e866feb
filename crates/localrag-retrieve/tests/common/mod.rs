#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use localrag_core::traits::{Embedder, Generator};
use localrag_embed::HashEmbedder;

pub const DIM: usize = localrag_embed::BGE_M3_DIM;

pub const PARIS: &str = "The capital of France is Paris. Paris is known for the Eiffel Tower.";
pub const LONDON: &str = "London is the capital of England. Big Ben stands beside the Thames.";

pub fn embedder() -> Arc<dyn Embedder> { Arc::new(HashEmbedder::new(DIM)) }

/// Replays canned replies in order and records every call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self { replies: Mutex::new(replies.into_iter().map(Into::into).collect()), calls: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> Vec<(String, usize)> { self.calls.lock().unwrap().clone() }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        self.calls.lock().unwrap().push((prompt.to_string(), max_new_tokens));
        self.replies.lock().unwrap().pop_front().ok_or_else(|| anyhow!("script exhausted"))
    }
}

pub struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str, _max_new_tokens: usize) -> Result<String> { Err(anyhow!("model offline")) }
}

pub fn evaluation_json(overall: f32) -> String {
    format!(
        r#"{{"evaluation": {{
            "relevance": {{"score": 8, "explanation": "on topic"}},
            "factual_accuracy": {{"score": 8, "explanation": "grounded"}},
            "completeness": {{"score": 6, "explanation": "brief"}},
            "coherence": {{"score": 9, "explanation": "clear"}},
            "overall_score": {overall},
            "overall_explanation": "could say more"
        }}}}"#
    )
}

/// Hashing embedder that refuses any text containing `marker`.
pub struct PickyEmbedder {
    inner: HashEmbedder,
    marker: &'static str,
}

impl PickyEmbedder {
    pub fn new(marker: &'static str) -> Arc<Self> { Arc::new(Self { inner: HashEmbedder::new(DIM), marker }) }
}

impl Embedder for PickyEmbedder {
    fn dim(&self) -> usize { DIM }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(bad) = texts.iter().find(|t| t.contains(self.marker)) {
            return Err(anyhow!("cannot embed {bad:?}"));
        }
        self.inner.embed_batch(texts)
    }
}
