use std::sync::Arc;

use tracing::debug;

use localrag_core::error::{Error, Result};
use localrag_core::traits::Generator;
use localrag_core::types::RetrievalResult;

pub const DEFAULT_MAX_NEW_TOKENS: usize = 50;

/// Turns a question plus retrieved chunks into a generated answer.
pub struct AnswerSynthesizer {
    generator: Arc<dyn Generator>,
    max_new_tokens: usize,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self { Self::with_max_new_tokens(generator, DEFAULT_MAX_NEW_TOKENS) }

    pub fn with_max_new_tokens(generator: Arc<dyn Generator>, max_new_tokens: usize) -> Self {
        Self { generator, max_new_tokens }
    }

    pub fn max_new_tokens(&self) -> usize { self.max_new_tokens }

    pub fn build_prompt(query: &str, result: &RetrievalResult) -> String {
        let documents: String = result
            .hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("Document {} ({} {:.3}): {}\n", i + 1, result.kind.label(), hit.score, hit.chunk.text))
            .collect();
        format!(
            "Answer the following question based on the provided documents:\n\n\
             Question: {query}\n\n\
             Documents:\n{documents}\n\
             Answer:"
        )
    }

    pub fn answer(&self, query: &str, result: &RetrievalResult) -> Result<String> {
        let prompt = Self::build_prompt(query, result);
        let answer = self.generator.generate(&prompt, self.max_new_tokens).map_err(Error::Generation)?;
        debug!(documents = result.len(), chars = answer.chars().count(), "answer synthesized");
        Ok(answer.trim().to_string())
    }
}
