use crate::embedder::{embedder_from_env, Embedder};
use crate::error::{EngineError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::OnceCell;
use triz_taxonomy::{Catalog, Parameter, Principle};

static SHARED: OnceCell<EmbeddingIndex> = OnceCell::const_new();

/// A parameter together with its cosine similarity to the query. The score is
/// a relevance indicator in `[-1, 1]`, not a probability.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredParameter {
    pub parameter: Parameter,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredPrinciple {
    pub principle: Principle,
    pub score: f32,
}

/// Semantic index over the two taxonomies: one cached embedding per entity
/// name, index-aligned with catalog order. Built once, read-only afterwards;
/// all searches are side-effect-free and safe to run concurrently.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    parameters: Vec<Parameter>,
    parameter_embeddings: Vec<Vec<f32>>,
    principles: Vec<Principle>,
    principle_embeddings: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Embed every parameter and principle name with the given backend.
    /// This is the expensive step; callers should build once and share.
    pub async fn build(embedder: Arc<dyn Embedder>, catalog: &Catalog) -> Result<Self> {
        let parameters = catalog.parameters().to_vec();
        let principles = catalog.principles().to_vec();

        let parameter_names: Vec<String> =
            parameters.iter().map(|p| p.name.clone()).collect();
        let principle_names: Vec<String> =
            principles.iter().map(|p| p.name.clone()).collect();

        let parameter_embeddings = embedder.embed_batch(&parameter_names).await?;
        let principle_embeddings = embedder.embed_batch(&principle_names).await?;

        if parameter_embeddings.len() != parameters.len()
            || principle_embeddings.len() != principles.len()
        {
            return Err(EngineError::Embedding(
                "Embedding batch returned a mismatched number of vectors".to_string(),
            ));
        }

        log::info!(
            "Built embedding index: {} parameters, {} principles (dim {})",
            parameters.len(),
            principles.len(),
            embedder.dimension()
        );

        Ok(Self {
            embedder,
            parameters,
            parameter_embeddings,
            principles,
            principle_embeddings,
        })
    }

    /// The process-wide index over the embedded catalog, built exactly once.
    /// Concurrent first callers await the same build instead of each loading
    /// the model independently.
    pub async fn shared() -> Result<&'static Self> {
        SHARED
            .get_or_try_init(|| async {
                let catalog = Catalog::load()?;
                let embedder = embedder_from_env()?;
                Self::build(embedder, catalog).await
            })
            .await
    }

    /// The `top_k` parameters nearest to `query` by cosine similarity,
    /// descending; ties keep catalog order. `top_k` beyond the taxonomy size
    /// returns the full taxonomy, fully ordered.
    pub async fn search_parameters(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredParameter>> {
        let ranked = self
            .search(query, top_k, &self.parameter_embeddings)
            .await?;
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredParameter {
                parameter: self.parameters[idx].clone(),
                score,
            })
            .collect())
    }

    /// Identical contract to [`Self::search_parameters`], over the principle
    /// taxonomy.
    pub async fn search_principles(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredPrinciple>> {
        let ranked = self
            .search(query, top_k, &self.principle_embeddings)
            .await?;
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredPrinciple {
                principle: self.principles[idx].clone(),
                score,
            })
            .collect())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<(usize, f32)>> {
        if top_k == 0 {
            return Err(EngineError::InvalidTopK);
        }

        log::debug!("Semantic search (query='{query}', top_k={top_k})");

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = embeddings
            .iter()
            .enumerate()
            .map(|(idx, embedding)| (idx, cosine_similarity(&query_embedding, embedding)))
            .collect();

        // Stable sort: equal scores preserve taxonomy order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k.min(embeddings.len()));
        Ok(scored)
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn principles(&self) -> &[Principle] {
        &self.principles
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::StubEmbedder;
    use pretty_assertions::assert_eq;
    use triz_taxonomy::ContradictionMatrix;

    fn fixture_catalog() -> Catalog {
        let parameters = vec![
            Parameter {
                id: 1,
                name: "Weight of moving object".to_string(),
                description: String::new(),
                examples: vec![],
            },
            Parameter {
                id: 2,
                name: "Speed".to_string(),
                description: String::new(),
                examples: vec![],
            },
            Parameter {
                id: 3,
                name: "Temperature".to_string(),
                description: String::new(),
                examples: vec![],
            },
        ];
        let principles = vec![
            Principle {
                id: 1,
                name: "Segmentation".to_string(),
                description: String::new(),
                rules: vec![],
                hints: vec![],
                examples: vec![],
            },
            Principle {
                id: 2,
                name: "Taking out".to_string(),
                description: String::new(),
                rules: vec![],
                hints: vec![],
                examples: vec![],
            },
        ];
        let matrix = ContradictionMatrix::parse(";1;2\n1,2;;\n;2;", "test.csv").unwrap();
        Catalog::from_parts(parameters, principles, matrix).unwrap()
    }

    async fn fixture_index() -> EmbeddingIndex {
        EmbeddingIndex::build(Arc::new(StubEmbedder::default()), &fixture_catalog())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn search_is_deterministic_and_descending() {
        let index = fixture_index().await;
        let first = index.search_parameters("weight", 3).await.unwrap();
        let second = index.search_parameters("weight", 3).await.unwrap();

        let first_ids: Vec<u32> = first.iter().map(|m| m.parameter.id).collect();
        let second_ids: Vec<u32> = second.iter().map(|m| m.parameter.id).collect();
        assert_eq!(first_ids, second_ids);

        for pair in first.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn top_k_is_clamped_to_taxonomy_size() {
        let index = fixture_index().await;
        let results = index.search_principles("anything", 1000).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn top_k_zero_is_rejected() {
        let index = fixture_index().await;
        let err = index.search_parameters("weight", 0).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTopK));
    }

    #[tokio::test]
    async fn scores_are_cosine_similarities() {
        let index = fixture_index().await;
        let embedder = StubEmbedder::default();
        let query = embedder.embed("speed").await.unwrap();
        let name = embedder.embed("Speed").await.unwrap();

        let results = index.search_parameters("speed", 3).await.unwrap();
        let speed = results
            .iter()
            .find(|m| m.parameter.id == 2)
            .expect("speed parameter present");
        let expected = cosine_similarity(&query, &name);
        assert!((speed.score - expected).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        // Mismatched lengths score zero rather than panicking.
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
