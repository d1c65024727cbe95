mod config;
mod error;
mod filesystem;
mod folder;
mod image_file;
mod loader;
mod transform;

pub use config::LoadConfig;
pub use error::{DatasetError, Result};
pub use folder::{ImageFolder, ImageSample};
pub use image_file::ImageFile;
pub use loader::{BatchLoader, ImageBatch};
pub use transform::Preprocess;
