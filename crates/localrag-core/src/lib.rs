#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod source;
pub mod traits;
pub mod types;

pub use chunker::{chunk, Chunker, ChunkingConfig};
pub use error::{Error, Result};
pub use source::TextDirSource;
pub use traits::{DocumentSource, Embedder, Generator};
pub use types::{Chunk, EmbeddingVector, Metric, RetrievalResult, ScoreKind, ScoredChunk};
