use thiserror::Error;
use triz_taxonomy::TaxonomyError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The embedding model failed to load. Fatal for the process: all
    /// semantic search depends on it.
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A per-call encoding failure, distinct from a missing backend.
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid parameter id {0}: parameter ids must be positive integers")]
    InvalidParameterId(i64),

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}
