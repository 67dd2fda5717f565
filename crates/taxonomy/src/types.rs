use serde::{Deserialize, Serialize};

/// One of the 39 standardized engineering parameters used to characterize
/// technical contradictions. Identity is `id`; entries are immutable after
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Stable identifier in `1..=39`.
    pub id: u32,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// One of the 40 inventive principles recommended by the contradiction
/// matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principle {
    /// Stable identifier in `1..=40`.
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Sub-principles: concrete formulations of how to apply the principle.
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}
