//! Error types for the ingestion crate.

use std::path::PathBuf;

use layer_catalog::CatalogError;
use thiserror::Error;

use crate::tiler::TilingFailure;

/// Errors that can stop an ingestion run.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Tiling tool '{tool}' is unavailable: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("Input archive not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Malformed archive name '{name}': {reason}")]
    MalformedIdentity { name: String, reason: String },

    #[error("Failed to extract archive {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("No raster files ({extensions}) found in {}", .dir.display())]
    NoRasterFound { dir: PathBuf, extensions: String },

    #[error("Tile generation failed: {0}")]
    Tiling(TilingFailure),

    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Layer catalog is corrupt: {0}")]
    CatalogCorrupt(#[source] CatalogError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestionError::Persistence {
            path: path.into(),
            source,
        }
    }
}

impl From<CatalogError> for IngestionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Corrupt { .. } => IngestionError::CatalogCorrupt(err),
            CatalogError::Io { path, source } => IngestionError::Persistence { path, source },
            CatalogError::Serialize(e) => IngestionError::Persistence {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            },
            CatalogError::InvalidEntry { .. } => IngestionError::InvalidConfig(err.to_string()),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
