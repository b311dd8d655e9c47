use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::CocoError;
use crate::progress::{ProgressEvent, ProgressSink, ProgressUnit};

pub fn extract_zip(
    zip_path: &Path,
    target_dir: &Path,
    sink: &dyn ProgressSink,
) -> Result<usize, CocoError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| CocoError::Archive(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| CocoError::Archive(err.to_string()))?;

    let total = archive.len();
    sink.event(ProgressEvent::Started {
        label: "Extracting files".to_string(),
        total: Some(total as u64),
        unit: ProgressUnit::Files,
    });

    for i in 0..total {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CocoError::Archive(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(CocoError::Archive(format!(
                    "zip entry path traversal detected: {}",
                    entry.name()
                )));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| CocoError::Filesystem(err.to_string()))?;
        } else {
            if let Some(parent) = entry_path.parent() {
                fs::create_dir_all(parent).map_err(|err| CocoError::Filesystem(err.to_string()))?;
            }
            let mut outfile = fs::File::create(&entry_path)
                .map_err(|err| CocoError::Filesystem(err.to_string()))?;
            io::copy(&mut entry, &mut outfile)
                .map_err(|err| CocoError::Archive(format!("{}: {err}", entry_path.display())))?;
        }
        sink.event(ProgressEvent::Advanced(1));
    }

    sink.event(ProgressEvent::Finished {
        message: format!("{} extracted.", zip_path.display()),
    });
    tracing::info!(archive = %zip_path.display(), entries = total, "extraction complete");
    Ok(total)
}
