//! Path utilities for locating files in the workspace.

use std::path::PathBuf;

/// Returns the workspace root directory.
///
/// This is determined by walking up from the test-utils manifest directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns `services/{service_name}/config/`.
pub fn service_config_dir(service_name: &str) -> PathBuf {
    workspace_root()
        .join("services")
        .join(service_name)
        .join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_holds_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn test_service_config_dir_layout() {
        let dir = service_config_dir("ingester");
        assert!(dir.ends_with("services/ingester/config"));
    }
}
