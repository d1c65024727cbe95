use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};

use crate::error::{DatasetError, Result};

#[derive(Clone, Debug)]
pub struct ImageFile {
    pub path: PathBuf,
}

impl ImageFile {
    /// Checks the file has a decodable image header. Pixel data is only read by [`ImageFile::load`].
    pub fn open(path: &Path) -> Result<Self> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|source| DatasetError::InvalidImage {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn load(&self) -> Result<DynamicImage> {
        ImageReader::open(&self.path)?
            .with_guessed_format()?
            .decode()
            .map_err(|source| DatasetError::InvalidImage {
                path: self.path.clone(),
                source,
            })
    }
}
