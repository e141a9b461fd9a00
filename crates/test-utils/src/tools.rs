//! Shell scripts that imitate the `gdal2tiles` command-line contract.
//!
//! Every fake answers `--version` successfully. What happens on a tiling
//! call depends on the [`FakeTool`] variant.

use std::path::{Path, PathBuf};

/// Behaviour of a fake tiling tool.
#[derive(Debug, Clone)]
pub enum FakeTool {
    /// Writes `tiles` PNG files plus `args.txt` (the received arguments)
    /// into the output directory (last argument), then exits 0.
    Succeeding { tiles: usize },
    /// Prints `stderr` to the error stream and exits with `exit_code`.
    Failing { exit_code: i32, stderr: String },
    /// Never finishes on its own.
    Hanging,
}

impl FakeTool {
    fn script(&self) -> String {
        let body = match self {
            FakeTool::Succeeding { tiles } => format!(
                r#"for last; do :; done
out="$last"
mkdir -p "$out"
echo "$*" > "$out/args.txt"
i=0
while [ "$i" -lt {tiles} ]; do
  z=$((10 + i % 6))
  mkdir -p "$out/$z/$i"
  : > "$out/$z/$i/0.png"
  i=$((i + 1))
done
exit 0"#
            ),
            FakeTool::Failing { exit_code, stderr } => format!(
                "echo '{}' >&2\nexit {}",
                stderr.replace('\'', ""),
                exit_code
            ),
            FakeTool::Hanging => "exec sleep 30".to_string(),
        };

        format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo \"GDAL 3.8.4, released 2024/02/08\"\n  exit 0\nfi\n{}\n",
            body
        )
    }
}

/// Write an executable fake tool into `dir` and return its path.
///
/// # Panics
///
/// Panics on any I/O error; meant for test setup only.
#[cfg(unix)]
pub fn write_fake_tool(dir: &Path, tool: FakeTool) -> PathBuf {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-gdal2tiles.sh");
    fs::write(&path, tool.script()).expect("write fake tool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
    path
}

/// Path that is guaranteed not to resolve to an executable.
pub fn missing_tool(dir: &Path) -> PathBuf {
    dir.join("no-such-gdal2tiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_answer_version() {
        for tool in [
            FakeTool::Succeeding { tiles: 2 },
            FakeTool::Failing {
                exit_code: 1,
                stderr: "boom".to_string(),
            },
            FakeTool::Hanging,
        ] {
            let script = tool.script();
            assert!(script.starts_with("#!/bin/sh\n"));
            assert!(script.contains("--version"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_succeeding_tool_writes_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_fake_tool(dir.path(), FakeTool::Succeeding { tiles: 3 });
        let out = dir.path().join("tiles");

        let status = std::process::Command::new(&tool)
            .args(["-z", "10-15", "input.tif"])
            .arg(&out)
            .status()
            .unwrap();

        assert!(status.success());
        assert!(out.join("10/0/0.png").exists());
        assert!(out.join("12/2/0.png").exists());
        assert!(out.join("args.txt").exists());
    }
}
