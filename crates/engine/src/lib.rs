//! # TRIZ Engine
//!
//! The retrieval and contradiction-resolution core: a semantic index over
//! the TRIZ parameter and principle taxonomies, and the deterministic matrix
//! lookup that turns an (improving, preserving) parameter pair into a set of
//! inventive principles.
//!
//! ## Architecture
//!
//! ```text
//! RawContradiction { action, positive_effect, negative_effect }
//!     │
//!     ├──> EmbeddingIndex (cosine nearest-neighbor over entity names)
//!     │      ├─> parameters_to_improve
//!     │      └─> parameters_to_preserve
//!     │
//!     └──> resolver (39x39 matrix, union over the Cartesian product)
//!            └─> TechnicalContradiction { ..., principles }
//! ```
//!
//! The embedding model and the two embedding tables are built exactly once
//! per process ([`EmbeddingIndex::shared`]); everything after that first
//! build is read-only and safe to call concurrently.

mod embedder;
mod error;
mod index;
mod pipeline;
pub mod resolver;

pub use embedder::{embedder_from_env, Embedder, EmbeddingMode, OrtEmbedder, StubEmbedder};
pub use error::{EngineError, Result};
pub use index::{cosine_similarity, EmbeddingIndex, ScoredParameter, ScoredPrinciple};
pub use pipeline::{resolve_contradiction, RawContradiction, TechnicalContradiction};
