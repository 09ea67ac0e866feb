//! localrag-generate
//!
//! [`Generator`] backed by an Ollama-compatible `/api/generate` endpoint.
//! Requests are sent from a private current-thread Tokio runtime, so
//! `generate` blocks and must not be called from inside another runtime.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use localrag_core::config::RagSettings;
use localrag_core::traits::Generator;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str) -> Result<Self> { Self::with_timeout(base_url, model, Duration::from_secs(120)) }

    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().context("building HTTP client")?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { client, runtime, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string() })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self> {
        Self::with_timeout(&settings.generator_url, &settings.generator_model, Duration::from_secs(settings.request_timeout_secs))
    }

    pub fn model(&self) -> &str { &self.model }

    async fn generate_async(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest { model: &self.model, prompt, stream: false, options: GenerateOptions { num_predict: max_new_tokens } };
        let resp = self.client.post(&url).json(&body).send().await.with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("generator returned {status}: {text}"));
        }
        let parsed: GenerateResponse = resp.json().await.context("decoding generator response")?;
        Ok(parsed.response)
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let start = Instant::now();
        let out = self.runtime.block_on(self.generate_async(prompt, max_new_tokens))?;
        debug!(model = %self.model, max_new_tokens, chars = out.len(), elapsed_ms = start.elapsed().as_millis() as u64, "generated text");
        Ok(out)
    }
}
