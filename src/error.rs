use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CocoError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("download request failed: {0}")]
    Http(String),

    #[error("download returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("failed to read annotation index at {path}: {message}")]
    IndexRead { path: PathBuf, message: String },

    #[error("failed to parse annotation index: {0}")]
    IndexParse(String),

    #[error("selection index {index} is out of range ({len} images matched)")]
    #[diagnostic(help("pick an index below the number of matching images"))]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("failed to open image {path}: {message}")]
    ImageOpen { path: PathBuf, message: String },

    #[error("failed to write image {path}: {message}")]
    ImageWrite { path: PathBuf, message: String },

    #[error("failed to present image: {0}")]
    Present(String),
}
