//! Synthetic archives shaped like Sentinel-1 SAFE products.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A well-formed granule name (S1A, IW, GRDH, acquired 2023-03-29 23:34:19).
pub const SAMPLE_GRANULE: &str =
    "S1A_IW_GRDH_1SDV_20230329T233419_20230329T233444_047865_05C06C_0883";

/// Write a zip archive at `dir/name` containing `entries` (path, contents).
///
/// Entry paths may contain `/` to create nested directories.
///
/// # Panics
///
/// Panics on any I/O error; meant for test setup only.
pub fn build_zip_archive(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("create archive file");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (entry_name, contents) in entries {
        zip.start_file(*entry_name, options).expect("start zip entry");
        zip.write_all(contents).expect("write zip entry");
    }
    zip.finish().expect("finish archive");
    path
}

/// Write `<granule>.zip` with the usual SAFE layout: a manifest, an
/// annotation file and one measurement raster per name in `rasters`.
pub fn sentinel_archive(dir: &Path, granule: &str, rasters: &[&str]) -> PathBuf {
    let safe = format!("{}.SAFE", granule);
    let manifest = format!("{}/manifest.safe", safe);
    let annotation = format!("{}/annotation/s1a-iw-grd-vv.xml", safe);
    let measurements: Vec<String> = rasters
        .iter()
        .map(|r| format!("{}/measurement/{}", safe, r))
        .collect();

    let mut entries: Vec<(&str, &[u8])> = vec![
        (manifest.as_str(), b"<xfdu:XFDU/>".as_slice()),
        (annotation.as_str(), b"<product/>".as_slice()),
    ];
    for m in &measurements {
        entries.push((m.as_str(), b"II*\0fake-geotiff".as_slice()));
    }

    build_zip_archive(dir, &format!("{}.zip", granule), &entries)
}
