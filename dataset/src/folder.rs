use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{DatasetError, Result};
use crate::filesystem::Filesystem;
use crate::image_file::ImageFile;

#[derive(Clone, Debug)]
pub struct ImageSample {
    pub image: ImageFile,
    /// Index of the sample's class folder in [`ImageFolder::classes`].
    pub label: usize,
}

/// A root directory whose subfolders are classes of images.
#[derive(Clone)]
pub struct ImageFolder {
    pub root: PathBuf,
    pub classes: Vec<String>,
    pub samples: Arc<Vec<ImageSample>>,
}

impl ImageFolder {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let fs = Filesystem::new(root.into());

        let mut classes = vec![];
        let mut samples = vec![];

        for (label, (name, dir)) in fs.class_dirs()?.into_iter().enumerate() {
            for path in Filesystem::image_files(&dir) {
                match ImageFile::open(&path) {
                    Ok(image) => samples.push(ImageSample { image, label }),
                    Err(err) => log::warn!("Skipping unreadable image: {err}"),
                }
            }
            classes.push(name);
        }

        if samples.is_empty() {
            return Err(DatasetError::Empty(fs.root().to_path_buf()));
        }

        log::info!(
            "Found {} images in {} classes under {}",
            samples.len(),
            classes.len(),
            fs.root().display()
        );

        Ok(Self {
            root: fs.root().to_path_buf(),
            classes,
            samples: Arc::new(samples),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn batches_per_epoch(&self, batch_size: usize, drop_last: bool) -> usize {
        if drop_last {
            self.len() / batch_size
        } else {
            self.len().div_ceil(batch_size)
        }
    }
}
