use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset root {0} does not exist or is not a directory")]
    MissingRoot(PathBuf),

    #[error("No readable images found under {0}")]
    Empty(PathBuf),

    #[error("Invalid load config: {0}")]
    InvalidConfig(String),

    #[error("File IO error: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to decode {path}: {source}")]
    InvalidImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Data loading channel closed")]
    LoaderClosed,
}
