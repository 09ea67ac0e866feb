//! Fixed-size character windows with overlap.
//!
//! Each input text is cut into windows of `chunk_size` characters whose starts
//! are `chunk_size - overlap` apart. Windows are trimmed and empty ones are
//! dropped; the last window may be shorter. Sizes count `char`s, so a window
//! never splits a code point.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 512, overlap: 128 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> usize { self.chunk_size - self.overlap }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { config: ChunkingConfig::default() }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Ok(Self { config: ChunkingConfig::new(chunk_size, overlap)? })
    }

    pub fn from_config(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig { self.config }

    /// Number of windows produced for a text of `char_len` characters, before
    /// empty windows are dropped: `ceil(char_len / step)`.
    pub fn window_count(&self, char_len: usize) -> usize { char_len.div_ceil(self.config.step()) }

    pub fn chunk<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .flat_map(|(i, t)| self.chunk_text(i, t.as_ref()))
            .collect();
        debug!(texts = texts.len(), chunks = chunks.len(), "chunked texts");
        chunks
    }

    pub fn chunk_text(&self, source_index: usize, text: &str) -> Vec<Chunk> {
        // byte offset of every char boundary, plus the end of the text
        let bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        let char_len = bounds.len() - 1;
        let step = self.config.step();
        let mut chunks = Vec::with_capacity(self.window_count(char_len));
        let mut start = 0usize;
        while start < char_len {
            let end = (start + self.config.chunk_size).min(char_len);
            let window = &text[bounds[start]..bounds[end]];
            let without_lead = window.trim_start();
            let lead_chars = window[..window.len() - without_lead.len()].chars().count();
            let trimmed = without_lead.trim_end();
            if !trimmed.is_empty() {
                chunks.push(Chunk::new(trimmed, source_index, start + lead_chars));
            }
            start += step;
        }
        chunks
    }
}

/// Chunk `texts` with the given window parameters.
pub fn chunk<S: AsRef<str>>(texts: &[S], chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(texts))
}
