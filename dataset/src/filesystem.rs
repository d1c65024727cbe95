use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DatasetError, Result};

const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp",
];

#[derive(Clone)]
pub struct Filesystem {
    root: PathBuf,
}

impl Filesystem {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Immediate subdirectories of the root, sorted by name. Each one is a class.
    pub fn class_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.root.is_dir() {
            return Err(DatasetError::MissingRoot(self.root.clone()));
        }

        Ok(WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                (name, entry.into_path())
            })
            .collect())
    }

    /// All files below `dir` with an image extension, in path order.
    pub fn image_files(dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_image_extension(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::has_image_extension;
    use std::path::Path;

    #[test]
    fn extension_filter() {
        assert!(has_image_extension(Path::new("a/face.JPG")));
        assert!(has_image_extension(Path::new("a/face.png")));
        assert!(!has_image_extension(Path::new("a/notes.txt")));
        assert!(!has_image_extension(Path::new("a/png")));
    }
}
