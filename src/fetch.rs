use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::error::CocoError;
use crate::progress::{ProgressEvent, ProgressSink, ProgressUnit};

pub const CHUNK_SIZE: usize = 8192;

pub struct Download {
    pub content_length: Option<u64>,
    pub body: Box<dyn Read>,
}

pub trait Downloader {
    fn open(&self, url: &str) -> Result<Download, CocoError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FetchOutcome {
    Cached { path: PathBuf },
    Downloaded { path: PathBuf, bytes: u64 },
    Failed { path: PathBuf, message: String },
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }
}

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, CocoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cocotext/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CocoError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| CocoError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, CocoError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(url, status, attempt, "retrying download");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(url, attempt, error = %err, "retrying download");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(CocoError::Http(err.to_string()));
                }
            }
        }
    }
}

impl Downloader for HttpDownloader {
    fn open(&self, url: &str) -> Result<Download, CocoError> {
        let response = self.send_with_retries(url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .status()
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
            return Err(CocoError::HttpStatus { status, message });
        }
        Ok(Download {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

// Failures are logged and reported in the outcome, never returned. The body
// goes to a temporary file that is renamed into place only once complete, so
// an interrupted download never looks like a cached one.
pub fn fetch_file(
    downloader: &dyn Downloader,
    url: &str,
    output_dir: &Path,
    file_name: &str,
    sink: &dyn ProgressSink,
) -> FetchOutcome {
    let path = output_dir.join(file_name);
    if path.exists() {
        tracing::debug!(path = %path.display(), "already present, skipping download");
        return FetchOutcome::Cached { path };
    }

    match download_to(downloader, url, output_dir, &path, file_name, sink) {
        Ok(bytes) => {
            sink.event(ProgressEvent::Finished {
                message: format!("{file_name} downloaded."),
            });
            tracing::info!(url, path = %path.display(), bytes, "download complete");
            FetchOutcome::Downloaded { path, bytes }
        }
        Err(err) => {
            sink.event(ProgressEvent::Finished {
                message: format!("{file_name} failed: {err}"),
            });
            tracing::warn!(url, error = %err, "download failed");
            FetchOutcome::Failed {
                path,
                message: err.to_string(),
            }
        }
    }
}

fn download_to(
    downloader: &dyn Downloader,
    url: &str,
    output_dir: &Path,
    path: &Path,
    file_name: &str,
    sink: &dyn ProgressSink,
) -> Result<u64, CocoError> {
    fs::create_dir_all(output_dir).map_err(|err| CocoError::Filesystem(err.to_string()))?;

    let mut download = downloader.open(url)?;
    sink.event(ProgressEvent::Started {
        label: file_name.to_string(),
        total: download.content_length,
        unit: ProgressUnit::Bytes,
    });

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}"))
        .suffix(".part")
        .tempfile_in(output_dir)
        .map_err(|err| CocoError::Filesystem(err.to_string()))?;

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = download
            .body
            .read(&mut buffer)
            .map_err(|err| CocoError::Http(err.to_string()))?;
        if read == 0 {
            break;
        }
        temp.as_file_mut()
            .write_all(&buffer[..read])
            .map_err(|err| CocoError::Filesystem(err.to_string()))?;
        written += read as u64;
        sink.event(ProgressEvent::Advanced(read as u64));
    }

    if let Some(expected) = download.content_length {
        if written != expected {
            return Err(CocoError::Http(format!(
                "body truncated: received {written} of {expected} bytes"
            )));
        }
    }

    temp.as_file_mut()
        .flush()
        .map_err(|err| CocoError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| CocoError::Filesystem(err.error.to_string()))?;
    Ok(written)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::output::JsonOutput;

    struct StaticDownloader(Vec<u8>);

    impl Downloader for StaticDownloader {
        fn open(&self, _url: &str) -> Result<Download, CocoError> {
            Ok(Download {
                content_length: Some(self.0.len() as u64),
                body: Box::new(Cursor::new(self.0.clone())),
            })
        }
    }

    struct ShortBody;

    impl Downloader for ShortBody {
        fn open(&self, _url: &str) -> Result<Download, CocoError> {
            Ok(Download {
                content_length: Some(100),
                body: Box::new(Cursor::new(vec![1u8; 10])),
            })
        }
    }

    #[test]
    fn writes_body_in_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let body = vec![7u8; CHUNK_SIZE * 2 + 5];
        let outcome = fetch_file(
            &StaticDownloader(body.clone()),
            "http://example.invalid/a.zip",
            temp.path(),
            "a.zip",
            &JsonOutput,
        );
        assert_eq!(
            outcome,
            FetchOutcome::Downloaded {
                path: temp.path().join("a.zip"),
                bytes: body.len() as u64,
            }
        );
        assert_eq!(std::fs::read(temp.path().join("a.zip")).unwrap(), body);
    }

    #[test]
    fn truncated_body_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let outcome = fetch_file(
            &ShortBody,
            "http://example.invalid/a.zip",
            temp.path(),
            "a.zip",
            &JsonOutput,
        );
        assert!(outcome.is_failed());
        assert!(!temp.path().join("a.zip").exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
    }
}
