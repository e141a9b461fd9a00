//! Tile pyramid generation through an external tiling tool.
//!
//! Pixel work is delegated to `gdal2tiles` (or any tool with the same
//! command-line contract). This module only builds the invocation, bounds it
//! with a timeout, and turns the result into a [`TileGenerationOutcome`].

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use sar_common::ZoomRange;

use crate::config::{tile_driver_for, tile_extension_for, PipelineConfig};
use crate::error::{IngestionError, Result};

/// Bound for the availability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// One tiling job.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub raster: PathBuf,
    pub output_dir: PathBuf,
    pub zoom: ZoomRange,
    /// Worker processes requested from the tool (at least 1)
    pub parallelism: usize,
}

/// Why a tiling run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilingFailureReason {
    ToolNotFound,
    NonZeroExit,
    Timeout,
}

impl fmt::Display for TilingFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TilingFailureReason::ToolNotFound => "tool-not-found",
            TilingFailureReason::NonZeroExit => "non-zero-exit",
            TilingFailureReason::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// A failed tiling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingFailure {
    pub reason: TilingFailureReason,
    /// Exit code, when the tool exited on its own
    pub exit_code: Option<i32>,
    /// The tool's error stream, passed through for display only
    pub diagnostics: String,
}

impl TilingFailure {
    pub fn new(reason: TilingFailureReason, diagnostics: impl Into<String>) -> Self {
        Self {
            reason,
            exit_code: None,
            diagnostics: diagnostics.into(),
        }
    }
}

impl fmt::Display for TilingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit code {})", code)?;
        }
        if let Some(line) = self.diagnostics.lines().rev().find(|l| !l.trim().is_empty()) {
            write!(f, ": {}", line.trim())?;
        }
        Ok(())
    }
}

/// Result of one tiling invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileGenerationOutcome {
    Succeeded { tile_count: usize },
    Failed(TilingFailure),
}

impl TileGenerationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, TileGenerationOutcome::Succeeded { .. })
    }

    /// Number of tiles written, only meaningful on success.
    pub fn tile_count(&self) -> Option<usize> {
        match self {
            TileGenerationOutcome::Succeeded { tile_count } => Some(*tile_count),
            TileGenerationOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TilingFailure> {
        match self {
            TileGenerationOutcome::Succeeded { .. } => None,
            TileGenerationOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Something that turns a raster into a tile pyramid.
#[async_trait]
pub trait TileGenerator: Send + Sync {
    /// Name shown in logs and errors.
    fn tool_name(&self) -> String;

    /// Check the tool is installed and runnable, without side effects.
    /// Returns a version or description string.
    async fn probe(&self) -> Result<String>;

    /// Generate tiles. Tool failures are reported in the outcome; `Err` is
    /// reserved for local I/O failures such as creating the output directory.
    /// A missing tool leaves the filesystem untouched.
    async fn generate(&self, request: &TileRequest) -> Result<TileGenerationOutcome>;
}

/// `gdal2tiles` invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct Gdal2Tiles {
    program: PathBuf,
    timeout: Duration,
    /// GDAL driver passed to the tool, e.g. `PNG`
    tile_driver: String,
    /// Extension of the files that driver writes
    tile_extension: String,
}

impl Gdal2Tiles {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TOOL_TIMEOUT_SECS),
            tile_driver: "PNG".to_string(),
            tile_extension: "png".to_string(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.tool)
            .with_timeout(Duration::from_secs(config.tool_timeout_secs))
            .with_tile_format(&config.tile_format)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accepts a driver name or an extension (`JPEG`, `jpg`, `webp`, ...).
    pub fn with_tile_format(mut self, format: &str) -> Self {
        self.tile_driver = tile_driver_for(format);
        self.tile_extension = tile_extension_for(format);
        self
    }

    /// Command-line arguments for a request, e.g.
    /// `-z 10-15 -w none --processes=4 <raster> <output_dir>`.
    ///
    /// The web viewer scaffold is always disabled; only tiles are written.
    pub fn args(&self, request: &TileRequest) -> Vec<String> {
        let mut args = vec![
            "-z".to_string(),
            request.zoom.to_string(),
            "-w".to_string(),
            "none".to_string(),
            format!("--processes={}", request.parallelism.max(1)),
        ];
        if self.tile_driver != "PNG" {
            args.push(format!("--tiledriver={}", self.tile_driver));
        }
        args.push(request.raster.to_string_lossy().into_owned());
        args.push(request.output_dir.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl TileGenerator for Gdal2Tiles {
    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    async fn probe(&self) -> Result<String> {
        let unavailable = |reason: String| IngestionError::ToolUnavailable {
            tool: self.tool_name(),
            reason,
        };

        let child = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => unavailable("executable not found".to_string()),
                _ => unavailable(e.to_string()),
            })?;

        let output = tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| unavailable("version probe timed out".to_string()))?
            .map_err(|e| unavailable(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(unavailable(format!(
                "version probe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let version = if stdout.trim().is_empty() {
            stderr.trim().to_string()
        } else {
            stdout.trim().to_string()
        };
        Ok(version)
    }

    async fn generate(&self, request: &TileRequest) -> Result<TileGenerationOutcome> {
        let args = self.args(request);
        info!(
            tool = %self.tool_name(),
            args = %args.join(" "),
            timeout_secs = self.timeout.as_secs(),
            "Starting tile generation"
        );

        // Progress output on stdout is discarded; stderr is kept for diagnostics.
        let spawned = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(TileGenerationOutcome::Failed(TilingFailure::new(
                    TilingFailureReason::ToolNotFound,
                    format!("{} not found", self.tool_name()),
                )));
            }
            Err(e) => {
                return Ok(TileGenerationOutcome::Failed(TilingFailure::new(
                    TilingFailureReason::NonZeroExit,
                    format!("failed to start {}: {}", self.tool_name(), e),
                )));
            }
        };

        // Created only once the tool is known to exist. gdal2tiles creates it
        // as well. Dropping `child` on error kills it.
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| IngestionError::persistence(&request.output_dir, e))?;

        let started = Instant::now();
        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(TileGenerationOutcome::Failed(TilingFailure::new(
                    TilingFailureReason::NonZeroExit,
                    format!("failed waiting for {}: {}", self.tool_name(), e),
                )));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Tiling tool timed out");
                return Ok(TileGenerationOutcome::Failed(TilingFailure::new(
                    TilingFailureReason::Timeout,
                    format!("no result after {}s", self.timeout.as_secs()),
                )));
            }
        };

        let diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Ok(TileGenerationOutcome::Failed(TilingFailure {
                reason: TilingFailureReason::NonZeroExit,
                exit_code: output.status.code(),
                diagnostics,
            }));
        }

        let tile_count = count_tiles(&request.output_dir, &self.tile_extension);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            tile_count, "Tile generation finished"
        );
        Ok(TileGenerationOutcome::Succeeded { tile_count })
    }
}

/// Count files with the given extension under `dir`, recursively.
pub fn count_tiles(dir: &Path, extension: &str) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .count()
}
