//! Catalog persistence.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};

/// Load/save edges of the catalog transaction.
///
/// Swapping the backing store only requires a new implementation of this
/// trait; the mutation rules live on [`Catalog`].
pub trait CatalogStore: Send + Sync {
    /// Where the catalog lives, for logs and reports.
    fn location(&self) -> String;

    /// Load the current catalog. A store with no catalog yet yields an empty
    /// one.
    fn load(&self) -> CatalogResult<Catalog>;

    /// Replace the stored catalog with `catalog`.
    fn save(&self, catalog: &Catalog) -> CatalogResult<()>;
}

/// Catalog kept in a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonCatalogStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> CatalogResult<Catalog> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No catalog file yet, starting empty");
                return Ok(Catalog::new());
            }
            Err(e) => return Err(CatalogError::io(&self.path, e)),
        };

        let catalog: Catalog =
            serde_json::from_str(&content).map_err(|source| CatalogError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), layers = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Write to a temporary file beside the target, then rename it over the
    /// target so readers never observe a half-written document.
    fn save(&self, catalog: &Catalog) -> CatalogResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

        let mut json = serde_json::to_string_pretty(catalog)?;
        json.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| CatalogError::io(&dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CatalogError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| CatalogError::io(&self.path, e.error))?;

        info!(path = %self.path.display(), layers = catalog.len(), "Saved catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::entry;

    #[test]
    fn test_missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("layers-index.json"));
        let catalog = store.load().unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers-index.json");
        fs::write(&path, "{ \"layers\": [ not json").unwrap();

        let err = JsonCatalogStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt { .. }));
        // The broken file is left for the operator to inspect.
        assert!(path.exists());
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers-index.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = JsonCatalogStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("nested").join("layers-index.json"));

        let catalog = Catalog::new()
            .with_entry(entry("a", "t/a"))
            .with_entry(entry("b", "t/b"));
        store.save(&catalog).unwrap();

        assert_eq!(store.load().unwrap(), catalog);
    }

    #[test]
    fn test_unknown_top_level_keys_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers-index.json");
        fs::write(&path, r#"{ "version": 2, "layers": [] }"#).unwrap();

        let store = JsonCatalogStore::new(&path);
        let catalog = store.load().unwrap().with_entry(entry("a", "t/a"));
        store.save(&catalog).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 2);
        assert_eq!(raw["layers"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("layers-index.json"));
        store.save(&Catalog::new()).unwrap();
        store.save(&Catalog::new().with_entry(entry("a", "t/a"))).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("layers-index.json")]);
    }
}
