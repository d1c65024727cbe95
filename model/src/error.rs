use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Image size {0} is not supported, it must be a power of two of at least 8")]
    UnsupportedImageSize(usize),

    #[error("Invalid layer configuration: {0}")]
    InvalidLayer(String),

    #[error("Invalid weight initialization: {0}")]
    InvalidInit(#[from] rand_distr::NormalError),

    #[error("Unknown device '{0}', expected one of auto, gpu, cpu")]
    UnknownDevice(String),
}
