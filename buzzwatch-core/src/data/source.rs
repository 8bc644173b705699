//! Data source trait and transport error types.
//!
//! A `DataSource` hands back the raw bytes of one table. It knows nothing about
//! CSV or the derived tables; parsing happens in `parse`, so the same source
//! abstraction serves HTTP, local files and in-memory mocks in tests.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Transport-level failure reaching a data source.
///
/// Kept distinct from `ParseError` so the scheduler can log the precise cause
/// of an aborted cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("rate limited by source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("fetch error: {0}")]
    Other(String),
}

/// Trait for anything that can produce the raw bytes of a table.
pub trait DataSource: Send + Sync {
    /// Human-readable name of this source (used in logs).
    fn name(&self) -> &str;

    /// Fetch the full payload. Either all bytes or an error; never partial data.
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// Reads a table from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        std::fs::read(&self.path).map_err(|e| FetchError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// Serves a fixed in-memory payload. Handy for tests and one-off scans of
/// data that is already on hand.
#[derive(Debug, Clone)]
pub struct StaticSource {
    bytes: Vec<u8>,
}

impl StaticSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl DataSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        Ok(self.bytes.clone())
    }
}
