//! Scratch workspaces for pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory laid out like a deployment:
///
/// ```text
/// <root>/input/      archives to process
/// <root>/extracted/  unpack destination
/// <root>/layers/     output base (layer directories + catalog)
/// <root>/bin/        fake tools
/// ```
///
/// Everything is removed when the value is dropped.
pub struct TestWorkspace {
    root: TempDir,
}

impl TestWorkspace {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp workspace");
        for sub in ["input", "bin"] {
            fs::create_dir_all(root.path().join(sub)).expect("create workspace dir");
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.path().join("input")
    }

    /// Not created up front, so tests can assert the pipeline creates it.
    pub fn extract_dir(&self) -> PathBuf {
        self.root.path().join("extracted")
    }

    /// Not created up front, so tests can assert nothing was written.
    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("layers")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.output_dir().join("layers-index.json")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
