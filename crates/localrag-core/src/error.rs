use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch ({what}): expected {expected}, got {actual}")]
    DimensionMismatch { what: &'static str, expected: usize, actual: usize },

    #[error("Index is empty: nothing has been built yet")]
    EmptyIndex,

    #[error("Corpus yielded no chunks: {0}")]
    EmptyCorpus(String),

    #[error("Not found: {0}")]
    SourceNotFound(String),

    #[error("Cannot normalize a zero vector ({0})")]
    ZeroVector(String),

    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Retriever index has not been built")]
    NotBuilt,

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Wraps any failure raised while running a HyDE retrieval.
    #[error("HyDE retrieval failed: {source}")]
    Retrieval {
        #[source]
        source: Box<Error>,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn retrieval(source: Error) -> Self { Self::Retrieval { source: Box::new(source) } }
}

pub type Result<T> = std::result::Result<T, Error>;
