//! Stage events emitted while a pipeline runs.
//!
//! The pipeline never prints. It reports progress as [`PipelineEvent`]s to a
//! [`PipelineObserver`]; the default [`TracingObserver`] turns them into
//! structured log records.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, warn};

use sar_common::{LayerId, ZoomRange};

/// Stage gates, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    ToolCheck,
    InputCheck,
    IdentityParsed,
    ArchiveUnpacked,
    RasterLocated,
    TilesGenerated,
    MetadataWritten,
    CatalogUpdated,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::ToolCheck,
        Stage::InputCheck,
        Stage::IdentityParsed,
        Stage::ArchiveUnpacked,
        Stage::RasterLocated,
        Stage::TilesGenerated,
        Stage::MetadataWritten,
        Stage::CatalogUpdated,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ToolCheck => "tool_check",
            Stage::InputCheck => "input_check",
            Stage::IdentityParsed => "identity_parsed",
            Stage::ArchiveUnpacked => "archive_unpacked",
            Stage::RasterLocated => "raster_located",
            Stage::TilesGenerated => "tiles_generated",
            Stage::MetadataWritten => "metadata_written",
            Stage::CatalogUpdated => "catalog_updated",
        }
    }

    /// 1-based position, for "step n/8" style output.
    pub fn ordinal(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a completed stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageDetail {
    ToolFound {
        tool: String,
        version: String,
    },
    InputFound {
        path: PathBuf,
        size_bytes: u64,
    },
    Identity {
        satellite: String,
        mode: String,
        product_type: String,
        acquisition_date: Option<String>,
        acquisition_time: Option<String>,
    },
    Unpacked {
        destination: PathBuf,
        entries: usize,
        /// First few entry names, for display
        sample: Vec<String>,
    },
    RasterSelected {
        path: PathBuf,
        size_bytes: u64,
        candidates: usize,
    },
    Tiles {
        output_dir: PathBuf,
        zoom: ZoomRange,
        tile_count: usize,
    },
    Metadata {
        path: PathBuf,
    },
    Catalog {
        location: String,
        layer_id: LayerId,
        replaced: bool,
        total_layers: usize,
    },
}

/// Progress notifications from one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    StageCompleted {
        stage: Stage,
        detail: StageDetail,
    },
    StageFailed {
        stage: Stage,
        reason: String,
        /// Raw tool output, when a subprocess failed
        diagnostics: Option<String>,
    },
    Completed {
        layer_id: LayerId,
        tile_count: usize,
    },
}

/// Receives pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted(stage) => {
                info!(stage = %stage, step = stage.ordinal(), total = Stage::ALL.len(), "Stage started");
            }
            PipelineEvent::StageCompleted { stage, detail } => log_detail(*stage, detail),
            PipelineEvent::StageFailed {
                stage,
                reason,
                diagnostics,
            } => {
                error!(stage = %stage, reason = %reason, "Stage failed");
                if let Some(diagnostics) = diagnostics.as_deref().filter(|d| !d.trim().is_empty()) {
                    warn!(stage = %stage, "Tool output:\n{}", diagnostics.trim_end());
                }
            }
            PipelineEvent::Completed {
                layer_id,
                tile_count,
            } => {
                info!(layer_id = %layer_id, tile_count, "Processing complete");
            }
        }
    }
}

fn log_detail(stage: Stage, detail: &StageDetail) {
    match detail {
        StageDetail::ToolFound { tool, version } => {
            info!(stage = %stage, tool = %tool, version = %version, "Tiling tool available");
        }
        StageDetail::InputFound { path, size_bytes } => {
            info!(
                stage = %stage,
                path = %path.display(),
                size_bytes = *size_bytes,
                "Input archive found"
            );
        }
        StageDetail::Identity {
            satellite,
            mode,
            product_type,
            acquisition_date,
            acquisition_time,
        } => {
            info!(
                stage = %stage,
                satellite = %satellite,
                mode = %mode,
                product_type = %product_type,
                date = acquisition_date.as_deref().unwrap_or("unknown"),
                time = acquisition_time.as_deref().unwrap_or("unknown"),
                "Parsed acquisition identity"
            );
            if acquisition_date.is_none() {
                warn!(stage = %stage, "Acquisition date unknown, layer keyed by granule id");
            }
        }
        StageDetail::Unpacked {
            destination,
            entries,
            sample,
        } => {
            info!(
                stage = %stage,
                destination = %destination.display(),
                entries,
                sample = %sample.join(", "),
                "Archive unpacked"
            );
        }
        StageDetail::RasterSelected {
            path,
            size_bytes,
            candidates,
        } => {
            info!(
                stage = %stage,
                raster = %path.display(),
                size_bytes,
                candidates,
                "Raster selected"
            );
        }
        StageDetail::Tiles {
            output_dir,
            zoom,
            tile_count,
        } => {
            info!(
                stage = %stage,
                output_dir = %output_dir.display(),
                zoom = %zoom,
                tile_count,
                "Tiles generated"
            );
        }
        StageDetail::Metadata { path } => {
            info!(stage = %stage, path = %path.display(), "Metadata written");
        }
        StageDetail::Catalog {
            location,
            layer_id,
            replaced,
            total_layers,
        } => {
            let action = if *replaced { "replaced" } else { "inserted" };
            info!(
                stage = %stage,
                location = %location,
                layer_id = %layer_id,
                action,
                total_layers,
                "Catalog updated"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::ToolCheck.ordinal(), 1);
        assert_eq!(Stage::CatalogUpdated.ordinal(), 8);
        let mut sorted = Stage::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Stage::ALL.to_vec());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::TilesGenerated.to_string(), "tiles_generated");
        assert_eq!(Stage::InputCheck.name(), "input_check");
    }
}
