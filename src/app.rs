use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::dataset::{self, AnnotationRecord, DatasetIndex, ImageRecord};
use crate::error::CocoError;
use crate::fetch::{self, Downloader, FetchOutcome};
use crate::fs_util;
use crate::progress::ProgressSink;
use crate::render::{self, LabelFont, Presenter};
use crate::store::{ANNOTATIONS_ARCHIVE, IMAGES_ARCHIVE, Store};

#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    pub force_extract: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareResult {
    pub downloads: Vec<FetchOutcome>,
    pub extractions: Vec<ExtractResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResult {
    pub archive: String,
    pub action: String,
    pub entries: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub prefix: String,
    pub total: usize,
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub image_id: u64,
    pub file_name: String,
    pub image_path: String,
    pub matched: usize,
    pub annotations: Vec<AnnotationRecord>,
}

pub struct App<P: Presenter> {
    config: ResolvedConfig,
    store: Store,
    presenter: P,
}

impl<P: Presenter> App<P> {
    pub fn new(config: ResolvedConfig, presenter: P) -> Self {
        let store = Store::from_config(&config);
        Self {
            config,
            store,
            presenter,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // Download failures land in the result; extraction failures are raised.
    pub fn prepare(
        &self,
        downloader: &dyn Downloader,
        options: &PrepareOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PrepareResult, CocoError> {
        self.store.ensure_base_dir()?;
        let base_dir = self.store.base_dir().as_std_path();

        let downloads = vec![
            fetch::fetch_file(
                downloader,
                &self.config.annotations_url,
                base_dir,
                ANNOTATIONS_ARCHIVE,
                sink,
            ),
            fetch::fetch_file(
                downloader,
                &self.config.images_url,
                base_dir,
                IMAGES_ARCHIVE,
                sink,
            ),
        ];

        let extractions = vec![
            self.extract_unless_done(
                &self.store.annotations_archive(),
                options,
                sink,
            )?,
            self.extract_unless_done(
                &self.store.images_archive(),
                options,
                sink,
            )?,
        ];

        Ok(PrepareResult {
            downloads,
            extractions,
        })
    }

    fn extract_unless_done(
        &self,
        archive: &Utf8Path,
        options: &PrepareOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractResult, CocoError> {
        let marker = self.store.extraction_marker(archive);
        if !options.force_extract && self.store.exists(&marker) {
            tracing::debug!(archive = %archive, "already extracted, skipping");
            return Ok(ExtractResult {
                archive: archive.to_string(),
                action: "skipped".to_string(),
                entries: None,
            });
        }
        if let Err(err) = fs::remove_file(marker.as_std_path()) {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(CocoError::Filesystem(format!("{marker}: {err}")));
            }
        }
        let entries = fs_util::extract_zip(
            archive.as_std_path(),
            self.store.base_dir().as_std_path(),
            sink,
        )?;
        fs::write(marker.as_std_path(), format!("{entries}\n"))
            .map_err(|err| CocoError::Filesystem(format!("{marker}: {err}")))?;
        Ok(ExtractResult {
            archive: archive.to_string(),
            action: "extracted".to_string(),
            entries: Some(entries),
        })
    }

    pub fn load_index(&self) -> Result<DatasetIndex, CocoError> {
        DatasetIndex::load(self.store.annotations_path().as_std_path())
    }

    pub fn matching_images<'a>(&self, index: &'a DatasetIndex) -> Vec<&'a ImageRecord> {
        let images = index.filter_by_prefix(&self.config.prefix);
        if self.config.annotated_only {
            index.filter_annotated(images)
        } else {
            images
        }
    }

    pub fn list(&self) -> Result<ListResult, CocoError> {
        let index = self.load_index()?;
        let images = self.matching_images(&index);
        Ok(ListResult {
            prefix: self.config.prefix.clone(),
            total: images.len(),
            images: images.into_iter().cloned().collect(),
        })
    }

    pub fn show(&self) -> Result<ShowResult, CocoError> {
        let index = self.load_index()?;
        self.show_from(&index)
    }

    pub fn show_from(&self, index: &DatasetIndex) -> Result<ShowResult, CocoError> {
        let images = self.matching_images(index);
        let selected = dataset::select(&images, self.config.selection_index)?;
        let annotations = index.annotations_for_image(selected.id);
        let image_path: Utf8PathBuf = self.store.image_path(&selected.file_name);

        tracing::info!(
            image_id = selected.id,
            file_name = %selected.file_name,
            annotations = annotations.len(),
            "rendering selection"
        );

        let font = LabelFont::load(&self.config.font_path, self.config.font_size);
        render::visualize(
            image_path.as_std_path(),
            &annotations,
            &font,
            &self.presenter,
        )?;

        Ok(ShowResult {
            image_id: selected.id,
            file_name: selected.file_name.clone(),
            image_path: image_path.to_string(),
            matched: images.len(),
            annotations: annotations.into_iter().cloned().collect(),
        })
    }
}
