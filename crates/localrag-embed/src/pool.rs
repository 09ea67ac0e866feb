use anyhow::{ensure, Context, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states, L2-normalized: `[B,T,H]` with a `[B,T]`
/// mask gives `[B,H]`.
pub fn mean_pool_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _, hidden_dim) = hidden.dims3().context("hidden states must be [B,T,H]")?;
    let eps = match hidden.dtype() { DType::F16 | DType::BF16 => 1e-6, _ => 1e-12 };

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?.maximum(eps)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(eps)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, hidden_dim], "pooled shape {:?} != [{batch}, {hidden_dim}]", pooled.dims());
    Ok(pooled)
}
