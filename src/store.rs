use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::ResolvedConfig;
use crate::error::CocoError;

pub const ANNOTATIONS_ARCHIVE: &str = "COCO_Text.zip";
pub const IMAGES_ARCHIVE: &str = "train2014.zip";
pub const ANNOTATIONS_FILE: &str = "COCO_Text.json";
pub const IMAGES_DIR: &str = "train2014";

#[derive(Debug, Clone)]
pub struct Store {
    base_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.base_dir.clone())
    }

    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    pub fn annotations_archive(&self) -> Utf8PathBuf {
        self.base_dir.join(ANNOTATIONS_ARCHIVE)
    }

    pub fn images_archive(&self) -> Utf8PathBuf {
        self.base_dir.join(IMAGES_ARCHIVE)
    }

    pub fn annotations_path(&self) -> Utf8PathBuf {
        self.base_dir.join(ANNOTATIONS_FILE)
    }

    pub fn images_dir(&self) -> Utf8PathBuf {
        self.base_dir.join(IMAGES_DIR)
    }

    pub fn image_path(&self, file_name: &str) -> Utf8PathBuf {
        self.images_dir().join(file_name)
    }

    // Written only after an archive was fully extracted.
    pub fn extraction_marker(&self, archive: &Utf8Path) -> Utf8PathBuf {
        let stem = archive.file_stem().unwrap_or("archive");
        self.base_dir.join(format!(".{stem}.extracted"))
    }

    pub fn ensure_base_dir(&self) -> Result<(), CocoError> {
        fs::create_dir_all(self.base_dir.as_std_path())
            .map_err(|err| CocoError::Filesystem(err.to_string()))
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new("/tmp/coco");
        assert_eq!(store.annotations_archive(), "/tmp/coco/COCO_Text.zip");
        assert_eq!(store.images_archive(), "/tmp/coco/train2014.zip");
        assert_eq!(store.annotations_path(), "/tmp/coco/COCO_Text.json");
        assert_eq!(
            store.extraction_marker(&store.images_archive()),
            "/tmp/coco/.train2014.extracted"
        );
        assert!(
            store
                .image_path("COCO_train2014_000000000009.jpg")
                .ends_with("train2014/COCO_train2014_000000000009.jpg")
        );
    }
}
