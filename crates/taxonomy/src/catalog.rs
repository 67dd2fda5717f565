use crate::error::{Result, TaxonomyError};
use crate::matrix::ContradictionMatrix;
use crate::types::{Parameter, Principle};
use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashSet;

const PARAMETERS_FILE: &str = "parameters.json";
const PRINCIPLES_FILE: &str = "principles.json";
const MATRIX_FILE: &str = "matrix.csv";

const PARAMETERS_JSON: &str = include_str!("../data/parameters.json");
const PRINCIPLES_JSON: &str = include_str!("../data/principles.json");
const MATRIX_CSV: &str = include_str!("../data/matrix.csv");

/// Expected shape of the shipped classical TRIZ data.
const PARAMETER_COUNT: usize = 39;
const PRINCIPLE_COUNT: usize = 40;

static CATALOG: OnceCell<Catalog> = OnceCell::new();

#[derive(Deserialize)]
struct ParametersFile {
    parameters: Vec<Parameter>,
}

/// The loaded taxonomies plus the contradiction matrix. Read-only for the
/// process lifetime once constructed.
#[derive(Debug, Clone)]
pub struct Catalog {
    parameters: Vec<Parameter>,
    principles: Vec<Principle>,
    matrix: ContradictionMatrix,
}

impl Catalog {
    /// The process-wide catalog, parsed from the embedded data files on first
    /// use and cached for the process lifetime.
    pub fn load() -> Result<&'static Self> {
        CATALOG.get_or_try_init(Self::from_embedded)
    }

    fn from_embedded() -> Result<Self> {
        let parameters: ParametersFile =
            serde_json::from_str(PARAMETERS_JSON).map_err(|e| {
                TaxonomyError::data_load(PARAMETERS_FILE, e.to_string())
            })?;
        let principles: Vec<Principle> = serde_json::from_str(PRINCIPLES_JSON)
            .map_err(|e| TaxonomyError::data_load(PRINCIPLES_FILE, e.to_string()))?;
        let matrix = ContradictionMatrix::parse(MATRIX_CSV, MATRIX_FILE)?;

        let catalog = Self::from_parts(parameters.parameters, principles, matrix)?;

        if catalog.parameters.len() != PARAMETER_COUNT {
            return Err(TaxonomyError::data_load(
                PARAMETERS_FILE,
                format!(
                    "expected {PARAMETER_COUNT} parameters, found {}",
                    catalog.parameters.len()
                ),
            ));
        }
        if catalog.principles.len() != PRINCIPLE_COUNT {
            return Err(TaxonomyError::data_load(
                PRINCIPLES_FILE,
                format!(
                    "expected {PRINCIPLE_COUNT} principles, found {}",
                    catalog.principles.len()
                ),
            ));
        }
        if catalog.matrix.rows() != PARAMETER_COUNT || catalog.matrix.cols() != PARAMETER_COUNT {
            return Err(TaxonomyError::data_load(
                MATRIX_FILE,
                format!(
                    "expected a {PARAMETER_COUNT}x{PARAMETER_COUNT} grid, found {}x{}",
                    catalog.matrix.rows(),
                    catalog.matrix.cols()
                ),
            ));
        }

        log::info!(
            "Loaded {} parameters, {} principles, {}x{} matrix",
            catalog.parameters.len(),
            catalog.principles.len(),
            catalog.matrix.rows(),
            catalog.matrix.cols()
        );

        Ok(catalog)
    }

    /// Build a catalog from caller-supplied taxonomies, validating ID
    /// uniqueness and positivity. Fixture catalogs in tests go through here.
    pub fn from_parts(
        parameters: Vec<Parameter>,
        principles: Vec<Principle>,
        matrix: ContradictionMatrix,
    ) -> Result<Self> {
        validate_ids(PARAMETERS_FILE, parameters.iter().map(|p| p.id))?;
        validate_ids(PRINCIPLES_FILE, principles.iter().map(|p| p.id))?;

        Ok(Self {
            parameters,
            principles,
            matrix,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn principles(&self) -> &[Principle] {
        &self.principles
    }

    #[must_use]
    pub const fn matrix(&self) -> &ContradictionMatrix {
        &self.matrix
    }

    pub fn parameter_by_id(&self, id: u32) -> Result<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| TaxonomyError::NotFound(format!("parameter with id {id}")))
    }

    pub fn principle_by_id(&self, id: u32) -> Result<&Principle> {
        self.principles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| TaxonomyError::NotFound(format!("principle with id {id}")))
    }

    /// Case-insensitive exact name match.
    pub fn parameter_by_name(&self, name: &str) -> Result<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| TaxonomyError::NotFound(format!("parameter named '{name}'")))
    }

    /// Case-insensitive exact name match.
    pub fn principle_by_name(&self, name: &str) -> Result<&Principle> {
        self.principles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| TaxonomyError::NotFound(format!("principle named '{name}'")))
    }

    /// A uniform sample of `count` principles without replacement. Asking for
    /// the whole catalog (or more) returns every principle in catalog order.
    #[must_use]
    pub fn random_principles(&self, count: usize) -> Vec<&Principle> {
        if count >= self.principles.len() {
            return self.principles.iter().collect();
        }
        let mut rng = rand::thread_rng();
        self.principles
            .choose_multiple(&mut rng, count)
            .collect()
    }
}

fn validate_ids(file: &'static str, ids: impl Iterator<Item = u32>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id == 0 {
            return Err(TaxonomyError::data_load(file, "entity id 0 is not allowed"));
        }
        if !seen.insert(id) {
            return Err(TaxonomyError::data_load(
                file,
                format!("duplicate entity id {id}"),
            ));
        }
    }
    Ok(())
}
