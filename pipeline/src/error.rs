use dataset::DatasetError;
use model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Failed to build models: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),
}
