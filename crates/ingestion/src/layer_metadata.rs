//! Per-layer metadata descriptor (`metadata.json`).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sar_common::LayerBounds;

use crate::error::{IngestionError, Result};
use crate::identity::AcquisitionIdentity;

/// Fixed name of the descriptor written next to each tile tree.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Descriptor persisted one directory above a layer's tiles.
///
/// Unknown acquisition fields are written as `null`, never omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub acquisition_date: Option<String>,
    pub acquisition_time: Option<String>,
    pub satellite: String,
    pub product_type: String,
    pub mode: String,
    pub granule_id: String,
    pub processing_date: NaiveDate,
    pub bounds: LayerBounds,
    pub notes: String,
}

impl LayerMetadata {
    pub fn new(
        identity: &AcquisitionIdentity,
        processing_date: NaiveDate,
        bounds: LayerBounds,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            acquisition_date: identity.acquisition_date_string(),
            acquisition_time: identity.acquisition_time_string(),
            satellite: identity.satellite.clone(),
            product_type: identity.product_type.clone(),
            mode: identity.mode.clone(),
            granule_id: identity.granule_id.clone(),
            processing_date,
            bounds,
            notes: notes.into(),
        }
    }
}

/// Writes [`LayerMetadata`] descriptors.
#[derive(Debug, Clone)]
pub struct MetadataWriter {
    notes: String,
}

impl MetadataWriter {
    pub fn new(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
        }
    }

    /// Where the descriptor for a tile directory lives: its parent directory.
    pub fn descriptor_path(tiles_dir: &Path) -> PathBuf {
        tiles_dir
            .parent()
            .unwrap_or(tiles_dir)
            .join(METADATA_FILE_NAME)
    }

    /// Build the descriptor and write it next to `tiles_dir`, replacing any
    /// previous content.
    pub async fn write(
        &self,
        identity: &AcquisitionIdentity,
        processing_date: NaiveDate,
        bounds: LayerBounds,
        tiles_dir: &Path,
    ) -> Result<LayerMetadata> {
        let metadata = LayerMetadata::new(identity, processing_date, bounds, self.notes.clone());
        let path = Self::descriptor_path(tiles_dir);

        let json = serde_json::to_string_pretty(&metadata).map_err(|e| {
            IngestionError::persistence(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestionError::persistence(parent, e))?;
        }
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| IngestionError::persistence(&path, e))?;

        debug!(path = %path.display(), "Wrote layer metadata");
        Ok(metadata)
    }
}
