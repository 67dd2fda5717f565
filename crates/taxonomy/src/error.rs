use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaxonomyError>;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Failed to load {file}: {reason}")]
    DataLoad { file: &'static str, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl TaxonomyError {
    pub(crate) fn data_load(file: &'static str, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            file,
            reason: reason.into(),
        }
    }
}
