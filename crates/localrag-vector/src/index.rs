//! Exact (brute-force) k-nearest-neighbor index.
//!
//! Stores vectors alongside a parallel payload sequence; the position in both
//! is the entry id. The index is rebuilt wholesale by [`VectorIndex::build`];
//! there is no insertion or deletion. `build` takes `&mut self`, so a search
//! can never observe a half-built index. Callers sharing one index across
//! threads must put it behind their own lock.
//!
//! Scores:
//! - [`Metric::L2`]: squared Euclidean distance, ascending.
//! - [`Metric::Cosine`]: inner product of L2-normalized vectors, descending.
//!   Every vector is normalized at build time and every query at search time;
//!   zero vectors are rejected with [`Error::ZeroVector`].
//!
//! Equal scores keep insertion order.

use std::cmp::Ordering;

use tracing::{debug, info};

use localrag_core::error::{Error, Result};
use localrag_core::types::Metric;

use crate::metric::{dot, normalize_in_place, normalized, squared_l2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex<T> {
    metric: Metric,
    dim: Option<usize>,
    vectors: Vec<Vec<f32>>,
    payloads: Vec<T>,
}

impl<T> VectorIndex<T> {
    pub fn new(metric: Metric) -> Self {
        Self { metric, dim: None, vectors: Vec::new(), payloads: Vec::new() }
    }

    pub fn metric(&self) -> Metric { self.metric }

    /// Dimension of the stored vectors, `None` until something is built.
    pub fn dim(&self) -> Option<usize> { self.dim }

    pub fn len(&self) -> usize { self.payloads.len() }

    pub fn is_empty(&self) -> bool { self.payloads.is_empty() }

    pub fn payload(&self, id: usize) -> Option<&T> { self.payloads.get(id) }

    /// Stored vector for `id` (normalized for cosine indexes).
    pub fn vector(&self, id: usize) -> Option<&[f32]> { self.vectors.get(id).map(Vec::as_slice) }

    pub fn entries(&self) -> impl Iterator<Item = (&[f32], &T)> {
        self.vectors.iter().map(Vec::as_slice).zip(self.payloads.iter())
    }

    /// Replace the index contents. On error the previous contents are kept.
    pub fn build(&mut self, mut vectors: Vec<Vec<f32>>, payloads: Vec<T>) -> Result<()> {
        let dim = validate_shape(&vectors, payloads.len())?;
        if self.metric == Metric::Cosine {
            for (i, v) in vectors.iter_mut().enumerate() {
                normalize_in_place(v, || format!("index vector {i}"))?;
            }
        }
        self.dim = dim;
        self.vectors = vectors;
        self.payloads = payloads;
        info!(metric = %self.metric, count = self.len(), dim = ?self.dim, "built vector index");
        Ok(())
    }

    /// Restore an index from vectors that are already in stored form (unit
    /// length for cosine). Shapes are validated; values are kept verbatim.
    pub(crate) fn from_stored(metric: Metric, vectors: Vec<Vec<f32>>, payloads: Vec<T>) -> Result<Self> {
        let dim = validate_shape(&vectors, payloads.len())?;
        Ok(Self { metric, dim, vectors, payloads })
    }

    /// Top `min(k, len)` neighbors of `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be greater than zero".into()));
        }
        let dim = match self.dim {
            Some(d) if !self.is_empty() => d,
            _ => return Err(Error::EmptyIndex),
        };
        if query.len() != dim {
            return Err(Error::DimensionMismatch { what: "query vector", expected: dim, actual: query.len() });
        }
        let mut scored: Vec<Neighbor> = match self.metric {
            Metric::L2 => self.vectors.iter().enumerate().map(|(id, v)| Neighbor { id, score: squared_l2(query, v) }).collect(),
            Metric::Cosine => {
                let q = normalized(query, || "query vector".to_string())?;
                self.vectors.iter().enumerate().map(|(id, v)| Neighbor { id, score: dot(&q, v) }).collect()
            }
        };
        let higher_is_better = self.metric.higher_is_better();
        // sort_by is stable: ties stay in insertion order
        scored.sort_by(|a, b| {
            let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
            if higher_is_better { ord.reverse() } else { ord }
        });
        scored.truncate(k);
        debug!(k, returned = scored.len(), metric = %self.metric, "vector search");
        Ok(scored)
    }

    /// Like [`search`](Self::search) but resolves ids to payloads.
    pub fn search_payloads(&self, query: &[f32], k: usize) -> Result<Vec<(&T, f32)>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .map(|n| (&self.payloads[n.id], n.score))
            .collect())
    }
}

fn validate_shape(vectors: &[Vec<f32>], payload_count: usize) -> Result<Option<usize>> {
    if vectors.len() != payload_count {
        return Err(Error::DimensionMismatch { what: "payload count", expected: vectors.len(), actual: payload_count });
    }
    let Some(first) = vectors.first() else { return Ok(None) };
    let dim = first.len();
    if dim == 0 {
        return Err(Error::InvalidConfig("embedding vectors must have at least one component".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch { what: "index vector", expected: dim, actual: bad.len() });
    }
    Ok(Some(dim))
}
