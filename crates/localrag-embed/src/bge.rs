//! BGE-M3 sentence embeddings: XLM-RoBERTa on candle, masked mean pooling,
//! unit-length output.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use localrag_core::traits::Embedder;

use crate::pool::mean_pool_l2;

pub const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;
const PAD_ID: u32 = 1;
/// Texts per forward pass.
const BATCH: usize = 16;

pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl BgeM3Embedder {
    pub fn new() -> Result<Self> { Self::from_dir(&resolve_model_dir()?) }

    /// Load `tokenizer.json`, `config.json` and `pytorch_model.bin` from `model_dir`.
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(path = %model_dir.display(), "loading BGE-M3");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id: PAD_ID,
            pad_token: "<pad>".to_string(),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: MAX_LEN, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("BGE-M3 loaded");
        Ok(Self { model, tokenizer, device })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(&[text.to_string()])?.pop().ok_or_else(|| anyhow!("BGE-M3 returned no embedding"))
    }

    /// One padded forward pass over `texts`.
    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let encodings = self.tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for enc in &encodings {
            ids.extend_from_slice(enc.get_ids());
            mask.extend_from_slice(enc.get_attention_mask());
        }
        let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let rows: Vec<Vec<f32>> = mean_pool_l2(&hidden, &attention_mask)?.to_device(&Device::Cpu)?.to_vec2()?;
        if let Some(bad) = rows.iter().find(|r| r.len() != BGE_M3_DIM) {
            return Err(anyhow!("BGE-M3 produced {} dims, expected {}", bad.len(), BGE_M3_DIM));
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > 100 * texts.len() as u64 { warn!(elapsed_ms, texts = texts.len(), "Slow embedding batch"); }
        Ok(rows)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { BGE_M3_DIM }
    fn max_len(&self) -> usize { MAX_LEN }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH) { out.extend(self.forward(batch)?); }
        debug!(texts = texts.len(), "embedded batch");
        Ok(out)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { info!("Device: Metal (MPS)"); return dev; }
    }
    info!("Device: CPU");
    Device::Cpu
}

fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { debug!("Using {}: {}", var, p.display()); return Ok(p); }
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { debug!("Using model dir: {}", p.display()); return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
