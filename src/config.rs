use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CocoError;

pub const DEFAULT_CONFIG_FILE: &str = "cocotext.json";
pub const DEFAULT_ANNOTATIONS_URL: &str =
    "http://vision.cornell.edu/se3/wp-content/uploads/2019/05/COCO_Text.zip";
pub const DEFAULT_IMAGES_URL: &str = "http://images.cocodataset.org/zips/train2014.zip";
pub const DEFAULT_BASE_DIR: &str = "./COCO-Text";
pub const DEFAULT_PREFIX: &str = "COCO_train2014_";
pub const DEFAULT_SELECTION_INDEX: usize = 300;
pub const DEFAULT_FONT_PATH: &str = "arial.ttf";
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub annotations_url: Option<String>,
    #[serde(default)]
    pub images_url: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub selection_index: Option<usize>,
    #[serde(default)]
    pub annotated_only: Option<bool>,
    #[serde(default)]
    pub font_path: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub annotations_url: String,
    pub images_url: String,
    pub base_dir: Utf8PathBuf,
    pub prefix: String,
    pub selection_index: usize,
    pub annotated_only: bool,
    pub font_path: PathBuf,
    pub font_size: f32,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_dir: Option<String>,
    pub prefix: Option<String>,
    pub selection_index: Option<usize>,
    pub annotated_only: bool,
}

impl ResolvedConfig {
    pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(base_dir) = &overrides.base_dir {
            self.base_dir = Utf8PathBuf::from(base_dir);
        }
        if let Some(prefix) = &overrides.prefix {
            self.prefix = prefix.clone();
        }
        if let Some(index) = overrides.selection_index {
            self.selection_index = index;
        }
        if overrides.annotated_only {
            self.annotated_only = true;
        }
        self
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    // A missing default file means defaults; a missing explicit one is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CocoError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CocoError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CocoError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            annotations_url: config
                .annotations_url
                .unwrap_or_else(|| DEFAULT_ANNOTATIONS_URL.to_string()),
            images_url: config
                .images_url
                .unwrap_or_else(|| DEFAULT_IMAGES_URL.to_string()),
            base_dir: Utf8PathBuf::from(
                config
                    .base_dir
                    .unwrap_or_else(|| DEFAULT_BASE_DIR.to_string()),
            ),
            prefix: config.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            selection_index: config.selection_index.unwrap_or(DEFAULT_SELECTION_INDEX),
            annotated_only: config.annotated_only.unwrap_or(false),
            font_path: PathBuf::from(
                config
                    .font_path
                    .unwrap_or_else(|| DEFAULT_FONT_PATH.to_string()),
            ),
            font_size: config.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.annotations_url, DEFAULT_ANNOTATIONS_URL);
        assert_eq!(resolved.images_url, DEFAULT_IMAGES_URL);
        assert_eq!(resolved.base_dir, Utf8PathBuf::from("./COCO-Text"));
        assert_eq!(resolved.prefix, "COCO_train2014_");
        assert_eq!(resolved.selection_index, 300);
        assert!(!resolved.annotated_only);
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = ConfigOverrides {
            base_dir: Some("/data/coco".to_string()),
            prefix: None,
            selection_index: Some(4),
            annotated_only: true,
        };
        let resolved = ResolvedConfig::default().apply(&overrides);
        assert_eq!(resolved.base_dir, Utf8PathBuf::from("/data/coco"));
        assert_eq!(resolved.prefix, DEFAULT_PREFIX);
        assert_eq!(resolved.selection_index, 4);
        assert!(resolved.annotated_only);
    }
}
