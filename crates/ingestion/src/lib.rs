//! Sentinel-1 archive ingestion library.
//!
//! Turns a compressed radar product into a web map tile pyramid on disk and
//! records the result in the shared layer catalog.
//!
//! # Architecture
//!
//! The [`Pipeline`] drives one archive through a fixed sequence of stage
//! gates:
//!
//! - tiling tool availability and input checks
//! - acquisition identity from the archive name ([`identity`])
//! - archive unpacking and raster selection ([`archive`], [`raster`])
//! - tile generation through an external tool ([`tiler`])
//! - per-layer metadata descriptor ([`layer_metadata`])
//! - catalog upsert (`layer-catalog`)
//!
//! Any failing gate stops the run. Metadata and catalog writes only happen
//! after tiling succeeds.

pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod layer_metadata;
mod pipeline;
pub mod raster;
pub mod tiler;

// Re-exports
pub use archive::{ArchiveUnpacker, ZipUnpacker};
pub use config::{LayerPresentation, PipelineConfig, RasterSelection};
pub use error::{IngestionError, Result};
pub use events::{PipelineEvent, PipelineObserver, Stage, StageDetail, TracingObserver};
pub use identity::{extract_identity, AcquisitionIdentity};
pub use layer_metadata::{LayerMetadata, MetadataWriter, METADATA_FILE_NAME};
pub use pipeline::{Pipeline, PipelineFailure, PipelineReport};
pub use tiler::{
    Gdal2Tiles, TileGenerationOutcome, TileGenerator, TileRequest, TilingFailure,
    TilingFailureReason,
};
