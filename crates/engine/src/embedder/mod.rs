//! Text-embedding backends.
//!
//! The engine only ever sees the [`Embedder`] trait; the calling layer picks
//! a concrete backend. `TRIZ_EMBEDDING_MODE` selects between the ONNX Runtime
//! model (`fast`, the default) and the deterministic hash-based stub (`stub`),
//! which needs no model files and backs the test suite.

mod ort_backend;
mod stub;

pub use ort_backend::OrtEmbedder;
pub use stub::StubEmbedder;

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::env;
use std::sync::Arc;

/// The single capability the engine needs from an embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EngineError::Embedding("empty embedding result".to_string()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Fast,
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("TRIZ_EMBEDDING_MODE")
            .unwrap_or_else(|_| "fast".to_string())
            .to_ascii_lowercase();
        match raw.as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(EngineError::EmbeddingUnavailable(format!(
                "Unsupported TRIZ_EMBEDDING_MODE '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }
}

/// Build the backend selected by the process environment.
pub fn embedder_from_env() -> Result<Arc<dyn Embedder>> {
    match EmbeddingMode::from_env()? {
        EmbeddingMode::Fast => Ok(Arc::new(OrtEmbedder::from_env()?)),
        EmbeddingMode::Stub => Ok(Arc::new(StubEmbedder::default())),
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}
