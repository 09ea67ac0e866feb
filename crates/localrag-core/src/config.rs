//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys use a double underscore, e.g. `APP_RAG__TOP_K=5`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed `[rag]` section; missing keys fall back to [`RagSettings::default`].
    pub fn settings(&self) -> anyhow::Result<RagSettings> {
        if self.figment.find_value("rag").is_err() {
            return Ok(RagSettings::default());
        }
        self.get("rag")
    }
}

/// Retrieval and generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub answer_max_tokens: usize,
    /// `direct` or `hyde`
    pub strategy: String,
    pub improve_threshold: f32,
    pub embedding_model: String,
    pub generator_model: String,
    pub generator_url: String,
    pub request_timeout_secs: u64,
    pub corpus_dir: String,
    pub snapshot_dir: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 128,
            top_k: 2,
            answer_max_tokens: 50,
            strategy: "direct".to_string(),
            improve_threshold: 8.0,
            embedding_model: "BAAI/bge-m3".to_string(),
            generator_model: "gpt2".to_string(),
            generator_url: "http://localhost:11434".to_string(),
            request_timeout_secs: 120,
            corpus_dir: "data/txt".to_string(),
            snapshot_dir: "data/indexes/snapshot".to_string(),
        }
    }
}

impl RagSettings {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { chunk_size: self.chunk_size, overlap: self.chunk_overlap }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking().validate()?;
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than zero".into()));
        }
        if !(0.0..=10.0).contains(&self.improve_threshold) {
            return Err(Error::InvalidConfig(format!("improve_threshold {} is outside 0..=10", self.improve_threshold)));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
