//! Uploaded images and their on-disk store.
//!
//! The mutation pipeline hands validated uploads to [`ImageStore::save`],
//! which files them under the resource's configured subdirectory and
//! returns the relative URL written into the entity.

use std::io;
use std::path::{Path, PathBuf};

/// An image received with a create/update request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_name: String,
    pub bytes: Vec<u8>,
    extension: String,
}

impl UploadedImage {
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let original_name = original_name.into();
        let extension = Path::new(&original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Self {
            original_name,
            bytes,
            extension,
        }
    }

    /// Lowercased extension of the original file name, `""` when absent.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Filesystem store for resource images, rooted at the configured directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist image bytes under `location/name` and return the relative URL
    /// the API serves it from.
    pub fn save(&self, location: &str, name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.root.join(location);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(name), bytes)?;
        Ok(format!("/images/{}/{}", location, name))
    }

    /// Resolve a served path, refusing anything that could escape the root.
    pub fn resolve(&self, location: &str, filename: &str) -> Option<PathBuf> {
        for segment in [location, filename] {
            if segment.is_empty()
                || segment == ".."
                || segment.contains('/')
                || segment.contains('\\')
            {
                return None;
            }
        }
        Some(self.root.join(location).join(filename))
    }
}
