//! Pipeline orchestration.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::Map;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use layer_catalog::{CatalogEntry, CatalogStore, JsonCatalogStore};
use sar_common::LayerId;

use crate::archive::{ArchiveUnpacker, ZipUnpacker};
use crate::config::{PipelineConfig, RasterSelection};
use crate::error::{IngestionError, Result};
use crate::events::{PipelineEvent, PipelineObserver, Stage, StageDetail, TracingObserver};
use crate::identity::{extract_identity, AcquisitionIdentity};
use crate::layer_metadata::MetadataWriter;
use crate::raster::{find_rasters, RasterCandidate};
use crate::tiler::{Gdal2Tiles, TileGenerationOutcome, TileGenerator, TileRequest};

/// Unpacked entry names shown in the unpack event.
const UNPACK_SAMPLE_SIZE: usize = 10;

/// A run that stopped at a stage gate.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: IngestionError,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub layer_id: LayerId,
    pub identity: AcquisitionIdentity,
    pub raster: PathBuf,
    pub layer_dir: PathBuf,
    pub tiles_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub catalog_location: String,
    pub tile_count: usize,
    /// True when an existing catalog entry was replaced
    pub catalog_replaced: bool,
    pub elapsed: Duration,
}

/// Drives one archive through every stage gate.
///
/// Collaborators default to `gdal2tiles`, zip extraction, the JSON catalog
/// under the output directory and tracing output. Each can be swapped with
/// the `with_*` builders.
pub struct Pipeline {
    config: PipelineConfig,
    tiler: Arc<dyn TileGenerator>,
    unpacker: Arc<dyn ArchiveUnpacker>,
    catalog: Arc<dyn CatalogStore>,
    observer: Arc<dyn PipelineObserver>,
    processing_date: Option<NaiveDate>,
}

impl Pipeline {
    /// Create a pipeline with default collaborators. Fails on invalid config.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tiler: Arc::new(Gdal2Tiles::from_config(&config)),
            unpacker: Arc::new(ZipUnpacker),
            catalog: Arc::new(JsonCatalogStore::new(config.catalog_path())),
            observer: Arc::new(TracingObserver),
            processing_date: None,
            config,
        })
    }

    pub fn with_tiler(mut self, tiler: Arc<dyn TileGenerator>) -> Self {
        self.tiler = tiler;
        self
    }

    pub fn with_unpacker(mut self, unpacker: Arc<dyn ArchiveUnpacker>) -> Self {
        self.unpacker = unpacker;
        self
    }

    pub fn with_catalog_store(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Pin the processing date written to metadata (defaults to today, local time).
    pub fn with_processing_date(mut self, date: NaiveDate) -> Self {
        self.processing_date = Some(date);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// Nothing is written under the output directory before tiling starts,
    /// and metadata and catalog are only written after tiling succeeds.
    pub async fn run(&self) -> std::result::Result<PipelineReport, PipelineFailure> {
        let started = Instant::now();
        let input = self.config.input_archive_path.as_path();

        self.run_stage(Stage::ToolCheck, self.check_tool()).await?;
        self.run_stage(Stage::InputCheck, self.check_input(input)).await?;
        let identity = self
            .run_stage(Stage::IdentityParsed, self.parse_identity(input))
            .await?;
        let files = self
            .run_stage(Stage::ArchiveUnpacked, self.unpack(input))
            .await?;
        let raster = self
            .run_stage(Stage::RasterLocated, self.locate_raster(&files))
            .await?;

        let tiles_dir = self.config.tiles_dir(&identity);
        let tile_count = self
            .run_stage(Stage::TilesGenerated, self.generate_tiles(&raster.path, &tiles_dir))
            .await?;
        let metadata_path = self
            .run_stage(Stage::MetadataWritten, self.write_metadata(&identity, &tiles_dir))
            .await?;

        let layer_id = self.config.layer_id(&identity);
        let entry = self.catalog_entry(&identity, &layer_id);
        let catalog_replaced = self
            .run_stage(Stage::CatalogUpdated, self.update_catalog(entry))
            .await?;

        if self.config.cleanup_extracted {
            self.remove_extracted().await;
        } else {
            info!(
                dir = %self.config.temp_extract_dir.display(),
                "Extracted files left in place"
            );
        }

        self.observer.on_event(&PipelineEvent::Completed {
            layer_id: layer_id.clone(),
            tile_count,
        });

        let layer_dir = self.config.layer_dir(&identity);
        Ok(PipelineReport {
            layer_id,
            identity,
            raster: raster.path,
            layer_dir,
            tiles_dir,
            metadata_path,
            catalog_location: self.catalog.location(),
            tile_count,
            catalog_replaced,
            elapsed: started.elapsed(),
        })
    }

    #[instrument(skip_all, fields(stage = %stage))]
    async fn run_stage<T, F>(&self, stage: Stage, work: F) -> std::result::Result<T, PipelineFailure>
    where
        F: Future<Output = Result<(T, StageDetail)>>,
    {
        self.observer.on_event(&PipelineEvent::StageStarted(stage));

        match work.await {
            Ok((value, detail)) => {
                self.observer
                    .on_event(&PipelineEvent::StageCompleted { stage, detail });
                Ok(value)
            }
            Err(source) => {
                let diagnostics = match &source {
                    IngestionError::Tiling(failure) => Some(failure.diagnostics.clone()),
                    _ => None,
                };
                self.observer.on_event(&PipelineEvent::StageFailed {
                    stage,
                    reason: source.to_string(),
                    diagnostics,
                });
                Err(PipelineFailure { stage, source })
            }
        }
    }

    async fn check_tool(&self) -> Result<((), StageDetail)> {
        let version = self.tiler.probe().await?;
        Ok((
            (),
            StageDetail::ToolFound {
                tool: self.tiler.tool_name(),
                version,
            },
        ))
    }

    async fn check_input(&self, input: &Path) -> Result<((), StageDetail)> {
        match tokio::fs::metadata(input).await {
            Ok(meta) if meta.is_file() => Ok((
                (),
                StageDetail::InputFound {
                    path: input.to_path_buf(),
                    size_bytes: meta.len(),
                },
            )),
            _ => Err(IngestionError::InputNotFound(input.to_path_buf())),
        }
    }

    async fn parse_identity(&self, input: &Path) -> Result<(AcquisitionIdentity, StageDetail)> {
        let identity = extract_identity(&input.to_string_lossy())?;
        let detail = StageDetail::Identity {
            satellite: identity.satellite.clone(),
            mode: identity.mode.clone(),
            product_type: identity.product_type.clone(),
            acquisition_date: identity.acquisition_date_string(),
            acquisition_time: identity.acquisition_time_string(),
        };
        Ok((identity, detail))
    }

    async fn unpack(&self, input: &Path) -> Result<(Vec<PathBuf>, StageDetail)> {
        let destination = &self.config.temp_extract_dir;
        let files = self.unpacker.unpack(input, destination).await?;

        let sample = files
            .iter()
            .take(UNPACK_SAMPLE_SIZE)
            .map(|f| {
                f.strip_prefix(destination)
                    .unwrap_or(f)
                    .display()
                    .to_string()
            })
            .collect();

        let detail = StageDetail::Unpacked {
            destination: destination.clone(),
            entries: files.len(),
            sample,
        };
        Ok((files, detail))
    }

    async fn locate_raster(&self, files: &[PathBuf]) -> Result<(RasterCandidate, StageDetail)> {
        let candidates = find_rasters(files, &self.config.raster_extensions);
        debug!(candidates = candidates.len(), "Raster candidates found");

        let Some(selected) = self.config.raster_selection.select(&candidates).cloned() else {
            let mut extensions = self.config.raster_extensions.join(", ");
            if let RasterSelection::NameContains(pattern) = &self.config.raster_selection {
                extensions.push_str(&format!(" containing '{}'", pattern));
            }
            return Err(IngestionError::NoRasterFound {
                dir: self.config.temp_extract_dir.clone(),
                extensions,
            });
        };

        if candidates.len() > 1 {
            warn!(
                candidates = candidates.len(),
                selected = %selected.path.display(),
                rule = ?self.config.raster_selection,
                "Several rasters found, tiling only the selected one"
            );
        }

        let detail = StageDetail::RasterSelected {
            path: selected.path.clone(),
            size_bytes: selected.size_bytes,
            candidates: candidates.len(),
        };
        Ok((selected, detail))
    }

    async fn generate_tiles(&self, raster: &Path, tiles_dir: &Path) -> Result<(usize, StageDetail)> {
        let request = TileRequest {
            raster: raster.to_path_buf(),
            output_dir: tiles_dir.to_path_buf(),
            zoom: self.config.zoom_range,
            parallelism: self.config.parallelism,
        };

        match self.tiler.generate(&request).await? {
            TileGenerationOutcome::Succeeded { tile_count } => Ok((
                tile_count,
                StageDetail::Tiles {
                    output_dir: request.output_dir,
                    zoom: request.zoom,
                    tile_count,
                },
            )),
            TileGenerationOutcome::Failed(failure) => Err(IngestionError::Tiling(failure)),
        }
    }

    async fn write_metadata(
        &self,
        identity: &AcquisitionIdentity,
        tiles_dir: &Path,
    ) -> Result<(PathBuf, StageDetail)> {
        let processing_date = self
            .processing_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        MetadataWriter::new(&self.config.layer.notes)
            .write(identity, processing_date, self.config.bounds, tiles_dir)
            .await?;

        let path = MetadataWriter::descriptor_path(tiles_dir);
        Ok((path.clone(), StageDetail::Metadata { path }))
    }

    fn catalog_entry(&self, identity: &AcquisitionIdentity, layer_id: &LayerId) -> CatalogEntry {
        CatalogEntry {
            id: layer_id.clone(),
            name: identity.display_name(),
            date: identity.acquisition_date_string(),
            satellite: identity.satellite.clone(),
            product_type: identity.product_type.clone(),
            tiles_path: self.config.tiles_path_template(identity),
            bounds: self.config.bounds.to_corners(),
            min_zoom: self.config.zoom_range.min(),
            max_zoom: self.config.zoom_range.max(),
            default_opacity: self.config.layer.default_opacity,
            colormap: self.config.layer.colormap.clone(),
            extra: Map::new(),
        }
    }

    /// Load, upsert, save. The store is synchronous, so the transaction runs
    /// on the blocking pool.
    async fn update_catalog(&self, entry: CatalogEntry) -> Result<(bool, StageDetail)> {
        entry.validate()?;

        let store = Arc::clone(&self.catalog);
        let layer_id = entry.id.clone();

        let (outcome, total_layers) = tokio::task::spawn_blocking(move || {
            let mut catalog = store.load()?;
            let outcome = catalog.upsert(entry);
            store.save(&catalog)?;
            Ok::<_, IngestionError>((outcome, catalog.len()))
        })
        .await
        .map_err(|e| {
            IngestionError::persistence(
                PathBuf::from(self.catalog.location()),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })??;

        let replaced = outcome.is_replacement();
        Ok((
            replaced,
            StageDetail::Catalog {
                location: self.catalog.location(),
                layer_id,
                replaced,
                total_layers,
            },
        ))
    }

    async fn remove_extracted(&self) {
        let dir = &self.config.temp_extract_dir;
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Removed extraction directory"),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Could not remove extraction directory"),
        }
    }
}
