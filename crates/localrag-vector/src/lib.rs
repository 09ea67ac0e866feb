//! localrag-vector
//!
//! Brute-force vector index with L2 and cosine metrics, plus a LanceDB-backed
//! snapshot of a built chunk index.

pub mod index;
pub mod metric;
pub mod schema;
pub mod snapshot;

pub use index::{Neighbor, VectorIndex};
pub use metric::rescale_cosine;
