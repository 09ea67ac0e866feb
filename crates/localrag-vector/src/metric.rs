//! Distance and similarity kernels over `f32` slices of equal length.

use localrag_core::error::{Error, Result};

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| { let d = x - y; d * d }).sum()
}

/// Divide `v` by its Euclidean norm in place. `what` names the vector in the
/// error raised for a zero (or non-finite) norm.
pub fn normalize_in_place(v: &mut [f32], what: impl FnOnce() -> String) -> Result<()> {
    let norm = magnitude(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::ZeroVector(what()));
    }
    for x in v.iter_mut() { *x /= norm; }
    Ok(())
}

pub fn normalized(v: &[f32], what: impl FnOnce() -> String) -> Result<Vec<f32>> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out, what)?;
    Ok(out)
}

/// Map a cosine similarity from `[-1, 1]` onto `[0, 1]`.
pub fn rescale_cosine(score: f32) -> f32 {
    ((score + 1.0) / 2.0).clamp(0.0, 1.0)
}
