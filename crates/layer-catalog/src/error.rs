//! Error types for catalog persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file exists but could not be parsed. Never treated as an
    /// empty catalog.
    #[error("Catalog at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Catalog I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid catalog entry '{id}': {message}")]
    InvalidEntry { id: String, message: String },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}
