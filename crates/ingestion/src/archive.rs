//! Archive unpacking.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{IngestionError, Result};

/// Extracts an archive and reports what it wrote.
#[async_trait]
pub trait ArchiveUnpacker: Send + Sync {
    /// Extract every entry of `archive` under `destination`, creating it if
    /// needed, and return the paths of the extracted files.
    async fn unpack(&self, archive: &Path, destination: &Path) -> Result<Vec<PathBuf>>;
}

/// Unpacker for `.zip` archives (the Sentinel-1 SAFE distribution format).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipUnpacker;

#[async_trait]
impl ArchiveUnpacker for ZipUnpacker {
    async fn unpack(&self, archive: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        let archive = archive.to_path_buf();
        let destination = destination.to_path_buf();
        let archive_for_err = archive.clone();

        tokio::task::spawn_blocking(move || extract_zip(&archive, &destination))
            .await
            .map_err(|e| IngestionError::Extraction {
                path: archive_for_err,
                reason: format!("extraction task failed: {}", e),
            })?
    }
}

fn extract_zip(archive: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
    let extraction = |reason: String| IngestionError::Extraction {
        path: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| extraction(e.to_string()))?;
    let mut zip = ZipArchive::new(file).map_err(|e| extraction(e.to_string()))?;

    fs::create_dir_all(destination).map_err(|e| IngestionError::persistence(destination, e))?;

    let mut extracted = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| extraction(e.to_string()))?;

        let relative = match entry.enclosed_name() {
            Some(name) => name.to_path_buf(),
            None => {
                warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
                continue;
            }
        };
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| IngestionError::persistence(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| IngestionError::persistence(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| IngestionError::persistence(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| extraction(format!("{}: {}", relative.display(), e)))?;

        debug!(path = %out_path.display(), size = entry.size(), "Extracted entry");
        extracted.push(out_path);
    }

    Ok(extracted)
}
