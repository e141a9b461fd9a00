//! Locating and choosing rasters among unpacked archive entries.

use std::path::{Path, PathBuf};

use crate::config::RasterSelection;

/// A raster candidate with its on-disk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Keep the files whose extension matches one of `extensions`
/// (case-insensitive, leading dot optional), sorted by path.
pub fn find_rasters(files: &[PathBuf], extensions: &[String]) -> Vec<RasterCandidate> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let mut rasters: Vec<RasterCandidate> = files
        .iter()
        .filter(|path| has_extension(path, &wanted))
        .map(|path| RasterCandidate {
            path: path.clone(),
            size_bytes: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        })
        .collect();

    rasters.sort_by(|a, b| a.path.cmp(&b.path));
    rasters
}

fn has_extension(path: &Path, wanted: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| wanted.iter().any(|w| w.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

impl RasterSelection {
    /// Pick one raster from candidates already in path order.
    pub fn select<'a>(&self, candidates: &'a [RasterCandidate]) -> Option<&'a RasterCandidate> {
        match self {
            RasterSelection::First => candidates.first(),
            RasterSelection::Largest => candidates.iter().fold(None, |best, c| match best {
                Some(b) if b.size_bytes >= c.size_bytes => Some(b),
                _ => Some(c),
            }),
            RasterSelection::NameContains(pattern) => {
                let pattern = pattern.to_lowercase();
                candidates.iter().find(|c| {
                    c.path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_lowercase().contains(&pattern))
                        .unwrap_or(false)
                })
            }
        }
    }
}
