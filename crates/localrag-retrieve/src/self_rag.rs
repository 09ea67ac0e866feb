//! Self-evaluating answer loop: retrieve, answer, grade the answer with the
//! generator, and rewrite it once when the grade falls below a threshold.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use localrag_core::error::Error;
use localrag_core::traits::Generator;

use crate::strategy::RetrievalStrategy;

pub const MAX_SCORE: f32 = 10.0;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("evaluation generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("malformed evaluation ({reason})")]
    Malformed { reason: String, raw: String },

    #[error("evaluation score {score} for {aspect} is outside 0..=10")]
    ScoreOutOfRange { aspect: &'static str, score: f32 },
}

#[derive(Debug, Error)]
pub enum SelfRagError {
    #[error(transparent)]
    Rag(#[from] Error),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectScore {
    pub score: f32,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub relevance: AspectScore,
    pub factual_accuracy: AspectScore,
    pub completeness: AspectScore,
    pub coherence: AspectScore,
    pub overall_score: f32,
    pub overall_explanation: String,
}

#[derive(Deserialize)]
struct Envelope {
    evaluation: Evaluation,
}

impl Evaluation {
    /// Parse generator output. Text around the JSON object is ignored; the
    /// object spans from the first `{` to the last `}`.
    pub fn parse(raw: &str) -> Result<Self, EvaluationError> {
        let malformed = |reason: String| EvaluationError::Malformed { reason, raw: raw.to_string() };
        let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
            return Err(malformed("no JSON object found".into()));
        };
        if end < start {
            return Err(malformed("no JSON object found".into()));
        }
        let envelope: Envelope = serde_json::from_str(&raw[start..=end]).map_err(|e| malformed(e.to_string()))?;
        let evaluation = envelope.evaluation;
        evaluation.check_ranges()?;
        Ok(evaluation)
    }

    fn check_ranges(&self) -> Result<(), EvaluationError> {
        let scores = [
            ("relevance", self.relevance.score),
            ("factual_accuracy", self.factual_accuracy.score),
            ("completeness", self.completeness.score),
            ("coherence", self.coherence.score),
            ("overall_score", self.overall_score),
        ];
        match scores.into_iter().find(|(_, s)| !(0.0..=MAX_SCORE).contains(s)) {
            Some((aspect, score)) => Err(EvaluationError::ScoreOutOfRange { aspect, score }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelfRagOptions {
    pub top_k: usize,
    /// Answers graded strictly below this are rewritten.
    pub improve_threshold: f32,
    pub response_max_tokens: usize,
    pub evaluation_max_tokens: usize,
}

impl Default for SelfRagOptions {
    fn default() -> Self {
        Self { top_k: 3, improve_threshold: 8.0, response_max_tokens: 512, evaluation_max_tokens: 1024 }
    }
}

#[derive(Debug, Clone)]
pub struct SelfRagResponse {
    pub final_response: String,
    pub evaluation: Evaluation,
    pub improved: bool,
    /// Distinct `source_index` values of the context chunks, in rank order.
    pub sources: Vec<usize>,
}

pub struct SelfRag {
    strategy: RetrievalStrategy,
    generator: Arc<dyn Generator>,
    options: SelfRagOptions,
}

impl SelfRag {
    pub fn new(strategy: RetrievalStrategy, generator: Arc<dyn Generator>, options: SelfRagOptions) -> Self {
        Self { strategy, generator, options }
    }

    pub fn options(&self) -> &SelfRagOptions { &self.options }

    pub fn generate_response(&self, query: &str) -> Result<SelfRagResponse, SelfRagError> {
        let retrieval = self.strategy.retrieve(query, self.options.top_k)?;
        let context = retrieval.result.texts().collect::<Vec<_>>().join("\n");
        let mut sources: Vec<usize> = Vec::new();
        for hit in &retrieval.result.hits {
            if !sources.contains(&hit.chunk.source_index) { sources.push(hit.chunk.source_index); }
        }

        let initial = self.generate(&initial_prompt(query, &context), self.options.response_max_tokens)?;
        let evaluation = self.evaluate(query, &initial, &context)?;
        info!(overall = evaluation.overall_score, threshold = self.options.improve_threshold, "answer evaluated");

        if evaluation.overall_score < self.options.improve_threshold {
            let improved = self.improve(query, &initial, &evaluation)?;
            return Ok(SelfRagResponse { final_response: improved, evaluation, improved: true, sources });
        }
        Ok(SelfRagResponse { final_response: initial, evaluation, improved: false, sources })
    }

    pub fn evaluate(&self, query: &str, response: &str, context: &str) -> Result<Evaluation, EvaluationError> {
        let raw = self
            .generator
            .generate(&evaluation_prompt(query, response, context), self.options.evaluation_max_tokens)
            .map_err(EvaluationError::Generation)?;
        debug!(chars = raw.len(), "evaluation received");
        Evaluation::parse(&raw)
    }

    pub fn improve(&self, query: &str, initial: &str, evaluation: &Evaluation) -> Result<String, Error> {
        let prompt = format!(
            "Improve this response based on the evaluation feedback:\n\
             Query: {query}\n\
             Initial Response: {initial}\n\
             Evaluation: {}\n\
             Feedback: {}\n\n\
             Generate an improved response that addresses the weaknesses identified.",
            evaluation.overall_score, evaluation.overall_explanation
        );
        self.generate(&prompt, self.options.response_max_tokens)
    }

    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String, Error> {
        Ok(self.generator.generate(prompt, max_new_tokens).map_err(Error::Generation)?.trim().to_string())
    }
}

fn initial_prompt(query: &str, context: &str) -> String {
    format!(
        "Based on the following context, answer the query:\n\
         Query: {query}\n\
         Context: {context}\n\n\
         Provide a comprehensive and accurate response."
    )
}

fn evaluation_prompt(query: &str, response: &str, context: &str) -> String {
    format!(
        r#"Evaluate the quality of this response to the given query.
Query: {query}
Context: {context}
Response: {response}

Score the following aspects from 1-10:
1. Relevance to query
2. Factual accuracy based on context
3. Completeness of answer
4. Coherence and clarity

Return the evaluation ONLY as a JSON object, with no other text, in exactly this format:
{{
    "evaluation": {{
        "relevance": {{"score": 9, "explanation": "..."}},
        "factual_accuracy": {{"score": 8, "explanation": "..."}},
        "completeness": {{"score": 7, "explanation": "..."}},
        "coherence": {{"score": 10, "explanation": "..."}},
        "overall_score": 8.5,
        "overall_explanation": "..."
    }}
}}"#
    )
}
