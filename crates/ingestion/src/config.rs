//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once (usually from the service's YAML file)
//! and handed to the [`Pipeline`](crate::Pipeline) at construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sar_common::{LayerBounds, LayerId, ZoomRange};

use crate::error::{IngestionError, Result};
use crate::identity::AcquisitionIdentity;

/// Default wall-clock bound for one tiling run (30 minutes).
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 1800;

/// Default catalog file name under the output base directory.
pub const DEFAULT_CATALOG_FILE: &str = "layers-index.json";

/// Everything one pipeline run needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Compressed Sentinel-1 archive to process
    pub input_archive_path: PathBuf,

    /// Directory the archive is unpacked into
    pub temp_extract_dir: PathBuf,

    /// Root directory holding layer directories and the catalog
    pub output_base_dir: PathBuf,

    /// Zoom levels to generate
    pub zoom_range: ZoomRange,

    /// Worker processes requested from the tiling tool
    pub parallelism: usize,

    /// Tile image format / file extension
    pub tile_format: String,

    /// Tiling tool executable (name on PATH or explicit path)
    pub tool: PathBuf,

    /// Hard timeout for the tiling call
    pub tool_timeout_secs: u64,

    /// Extensions recognised as rasters after unpacking
    pub raster_extensions: Vec<String>,

    /// Which raster to tile when several are found
    pub raster_selection: RasterSelection,

    /// Catalog file name under `output_base_dir`
    pub catalog_file_name: String,

    /// Prefix for `tilesPath` URLs. Defaults to `output_base_dir`.
    pub tiles_url_base: Option<String>,

    /// Layer bounds written to metadata and the catalog.
    // TODO: derive from the selected raster's georeferencing instead of a fixed region.
    pub bounds: LayerBounds,

    /// Presentation defaults copied into catalog entries
    pub layer: LayerPresentation,

    /// Remove the extraction directory after a successful run
    pub cleanup_extracted: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_archive_path: PathBuf::from(
                "src/data/S1A_IW_GRDH_1SDV_20230329T233419_20230329T233444_047865_05C06C_0883.zip",
            ),
            temp_extract_dir: PathBuf::from("temp_extracted"),
            output_base_dir: PathBuf::from("src/data/nasa-layers"),
            zoom_range: ZoomRange::default(),
            parallelism: 4,
            tile_format: "png".to_string(),
            tool: PathBuf::from("gdal2tiles.py"),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            raster_extensions: vec!["tif".to_string(), "tiff".to_string()],
            raster_selection: RasterSelection::First,
            catalog_file_name: DEFAULT_CATALOG_FILE.to_string(),
            tiles_url_base: None,
            // Lima metropolitan region
            bounds: LayerBounds::new(-77.2, -12.3, -76.7, -11.7),
            layer: LayerPresentation::default(),
            cleanup_extracted: false,
        }
    }
}

/// Rule for choosing one raster among several unpacked candidates.
///
/// Candidates are always considered in lexicographic path order, so the
/// choice never depends on filesystem enumeration order.
///
/// In YAML this is either a plain rule name (`first`, `largest`) or a
/// single-key map such as `{ name_contains: vv }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RasterSelectionRepr", into = "RasterSelectionRepr")]
pub enum RasterSelection {
    /// First candidate in path order
    #[default]
    First,
    /// Largest file; ties go to the first in path order
    Largest,
    /// First candidate whose file name contains the pattern
    /// (case-insensitive), e.g. a polarisation such as "vv"
    NameContains(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RasterSelectionRepr {
    Rule(String),
    NameContains { name_contains: String },
}

impl TryFrom<RasterSelectionRepr> for RasterSelection {
    type Error = String;

    fn try_from(repr: RasterSelectionRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RasterSelectionRepr::Rule(rule) => match rule.trim().to_lowercase().as_str() {
                "first" => Ok(RasterSelection::First),
                "largest" => Ok(RasterSelection::Largest),
                _ => Err(format!(
                    "unknown raster_selection '{}', expected first, largest or {{ name_contains: <pattern> }}",
                    rule
                )),
            },
            RasterSelectionRepr::NameContains { name_contains } => {
                Ok(RasterSelection::NameContains(name_contains))
            }
        }
    }
}

impl From<RasterSelection> for RasterSelectionRepr {
    fn from(selection: RasterSelection) -> Self {
        match selection {
            RasterSelection::First => RasterSelectionRepr::Rule("first".to_string()),
            RasterSelection::Largest => RasterSelectionRepr::Rule("largest".to_string()),
            RasterSelection::NameContains(name_contains) => {
                RasterSelectionRepr::NameContains { name_contains }
            }
        }
    }
}

/// Catalog presentation defaults for new layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPresentation {
    pub default_opacity: f64,
    pub colormap: String,
    /// Free-text note stored in the metadata descriptor
    pub notes: String,
}

impl Default for LayerPresentation {
    fn default() -> Self {
        Self {
            default_opacity: 0.6,
            colormap: "sar-intensity".to_string(),
            notes: "Sentinel-1 SAR data processed for flood monitoring".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(IngestionError::InvalidConfig(msg));

        if self.parallelism < 1 {
            return invalid("parallelism must be at least 1".to_string());
        }
        if self.tool_timeout_secs == 0 {
            return invalid("tool_timeout_secs must be greater than 0".to_string());
        }
        if self.tile_format.trim().is_empty() {
            return invalid("tile_format cannot be empty".to_string());
        }
        if self.tool.as_os_str().is_empty() {
            return invalid("tool cannot be empty".to_string());
        }
        if self.raster_extensions.iter().all(|e| e.trim().is_empty()) {
            return invalid("raster_extensions must name at least one extension".to_string());
        }
        if self.catalog_file_name.trim().is_empty() {
            return invalid("catalog_file_name cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.layer.default_opacity) {
            return invalid(format!(
                "layer.default_opacity {} is outside [0, 1]",
                self.layer.default_opacity
            ));
        }
        if !self.bounds.is_valid() {
            return invalid(format!("bounds {:?} do not describe a valid region", self.bounds));
        }
        if let RasterSelection::NameContains(pattern) = &self.raster_selection {
            if pattern.is_empty() {
                return invalid("raster_selection.name_contains cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Path of the shared catalog document.
    pub fn catalog_path(&self) -> PathBuf {
        self.output_base_dir.join(&self.catalog_file_name)
    }

    /// Catalog id for a layer.
    pub fn layer_id(&self, identity: &AcquisitionIdentity) -> LayerId {
        LayerId::sentinel1(&identity.layer_key())
    }

    /// Directory name for a layer, e.g. "2023-03-29_sentinel1".
    pub fn layer_dir_name(&self, identity: &AcquisitionIdentity) -> String {
        format!("{}_sentinel1", identity.layer_key())
    }

    pub fn layer_dir(&self, identity: &AcquisitionIdentity) -> PathBuf {
        self.output_base_dir.join(self.layer_dir_name(identity))
    }

    pub fn tiles_dir(&self, identity: &AcquisitionIdentity) -> PathBuf {
        self.layer_dir(identity).join("tiles")
    }

    /// `tilesPath` template for the catalog, e.g.
    /// `src/data/nasa-layers/2023-03-29_sentinel1/tiles/{z}/{x}/{y}.png`.
    pub fn tiles_path_template(&self, identity: &AcquisitionIdentity) -> String {
        let base = match &self.tiles_url_base {
            Some(base) => base.clone(),
            None => path_to_url(&self.output_base_dir),
        };
        let base = base.trim_end_matches('/');
        let dir = self.layer_dir_name(identity);
        let ext = self.tile_extension();

        if base.is_empty() {
            format!("{}/tiles/{{z}}/{{x}}/{{y}}.{}", dir, ext)
        } else {
            format!("{}/{}/tiles/{{z}}/{{x}}/{{y}}.{}", base, dir, ext)
        }
    }

    /// Extension of the tile files the tool writes for `tile_format`.
    pub fn tile_extension(&self) -> String {
        tile_extension_for(&self.tile_format)
    }
}

/// File extension written for a tile format or GDAL driver name. The JPEG
/// driver writes `.jpg`; other drivers use their lower-cased name.
pub fn tile_extension_for(format: &str) -> String {
    let format = format.trim().trim_start_matches('.').to_lowercase();
    match format.as_str() {
        "jpeg" | "jpg" => "jpg".to_string(),
        _ => format,
    }
}

/// GDAL driver name for a tile format, e.g. `jpg` -> `JPEG`.
pub fn tile_driver_for(format: &str) -> String {
    match tile_extension_for(format).as_str() {
        "jpg" => "JPEG".to_string(),
        other => other.to_uppercase(),
    }
}

fn path_to_url(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
