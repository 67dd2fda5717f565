use crate::error::Result;
use crate::index::EmbeddingIndex;
use crate::resolver;
use serde::{Deserialize, Serialize};
use triz_taxonomy::Catalog;
use uuid::Uuid;

/// The raw extraction triple produced by an upstream extractor (an LLM, a
/// human, a test). The core never interprets it beyond embedding the two
/// effect strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContradiction {
    /// Concise description of the action.
    pub action: String,
    /// The improvement caused by the action.
    pub positive_effect: String,
    /// The deterioration caused by the action.
    pub negative_effect: String,
}

/// A fully resolved technical contradiction. The parameter and principle
/// fields are derived by the pipeline, never supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalContradiction {
    pub uuid: Uuid,
    pub action: String,
    pub positive_effect: String,
    pub negative_effect: String,
    pub parameters_to_improve: Vec<u32>,
    pub parameters_to_preserve: Vec<u32>,
    /// Recommended inventive principle names, in ascending principle-ID
    /// order.
    pub principles: Vec<String>,
}

/// Ground a raw contradiction into taxonomy IDs and resolve it through the
/// matrix.
///
/// The positive effect is searched for parameters to improve, the negative
/// effect for parameters to preserve; the top `max_parameters` IDs of each
/// search feed the matrix lookup. A pure mapping for a fixed index and
/// catalog: any failure propagates, so a returned record is never partially
/// populated.
pub async fn resolve_contradiction(
    index: &EmbeddingIndex,
    catalog: &Catalog,
    raw: RawContradiction,
    max_parameters: usize,
) -> Result<TechnicalContradiction> {
    let improve = index
        .search_parameters(&raw.positive_effect, max_parameters)
        .await?;
    let preserve = index
        .search_parameters(&raw.negative_effect, max_parameters)
        .await?;

    let parameters_to_improve: Vec<u32> = improve.iter().map(|m| m.parameter.id).collect();
    let parameters_to_preserve: Vec<u32> = preserve.iter().map(|m| m.parameter.id).collect();

    let improving: Vec<i64> = parameters_to_improve.iter().map(|&id| i64::from(id)).collect();
    let preserving: Vec<i64> = parameters_to_preserve.iter().map(|&id| i64::from(id)).collect();

    let principles = resolver::resolve(catalog, &improving, &preserving)?;

    log::info!(
        "Resolved contradiction '{}': improve {parameters_to_improve:?}, preserve {parameters_to_preserve:?}, {} principles",
        raw.action,
        principles.len()
    );

    Ok(TechnicalContradiction {
        uuid: Uuid::new_v4(),
        action: raw.action,
        positive_effect: raw.positive_effect,
        negative_effect: raw.negative_effect,
        parameters_to_improve,
        parameters_to_preserve,
        principles: principles.into_iter().map(|p| p.name).collect(),
    })
}
