//! Configuration loader for sar-ingester.
//!
//! Loads a YAML file holding logging settings and the pipeline configuration.
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ingestion::PipelineConfig;
use sar_common::ZoomRange;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Pipeline settings that can be given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PipelineOverrides {
    pub input: Option<PathBuf>,
    pub output_base: Option<PathBuf>,
    pub zoom: Option<ZoomRange>,
    pub processes: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub cleanup: bool,
}

impl PipelineOverrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input_archive_path = input.clone();
        }
        if let Some(output_base) = &self.output_base {
            config.output_base_dir = output_base.clone();
        }
        if let Some(zoom) = self.zoom {
            config.zoom_range = zoom;
        }
        if let Some(processes) = self.processes {
            config.parallelism = processes;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.tool_timeout_secs = timeout_secs;
        }
        if self.cleanup {
            config.cleanup_extracted = true;
        }
    }
}

/// Load the configuration. Without a path, defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            parse_config(&content).with_context(|| format!("Invalid config file {:?}", path))?
        }
        None => ServiceConfig::default(),
    };

    validate_logging_config(&config.logging)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<ServiceConfig> {
    let expanded = expand_env_vars(content)?;
    let config: ServiceConfig =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse config YAML")?;
    Ok(config)
}

/// Substitute `${VAR}` and `${VAR:-default}` occurrences. Comment lines are
/// copied as-is.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
        } else {
            result.push_str(&expand_line(line)?);
        }
    }
    Ok(result)
}

fn expand_line(line: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    anyhow::ensure!(
        LOG_LEVELS.contains(&config.level.to_lowercase().as_str()),
        "logging.level must be one of {:?}, got '{}'",
        LOG_LEVELS,
        config.level
    );
    anyhow::ensure!(
        LOG_FORMATS.contains(&config.format.to_lowercase().as_str()),
        "logging.format must be one of {:?}, got '{}'",
        LOG_FORMATS,
        config.format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion::RasterSelection;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("SAR_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${SAR_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("SAR_NONEXISTENT_VAR");
        let result = expand_env_vars("value_${SAR_NONEXISTENT_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("SAR_REQUIRED_VAR");
        assert!(expand_env_vars("${SAR_REQUIRED_VAR}").is_err());
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        assert!(expand_env_vars("dir: ${SAR_OUTPUT").is_err());
    }

    #[test]
    fn test_expand_env_vars_skips_comments() {
        std::env::remove_var("SAR_COMMENTED_VAR");
        std::env::set_var("SAR_LIVE_VAR", "live");
        let content = "# uses ${SAR_COMMENTED_VAR}\n  # ${VAR:-default} syntax\nkey: ${SAR_LIVE_VAR}\n";
        assert_eq!(
            expand_env_vars(content).unwrap(),
            "# uses ${SAR_COMMENTED_VAR}\n  # ${VAR:-default} syntax\nkey: live\n"
        );
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("SAR_SET_VAR", "custom");
        assert_eq!(resolve_var_expr("SAR_SET_VAR:-default").unwrap(), "custom");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.pipeline.parallelism, 4);
    }

    #[test]
    fn test_partial_file() {
        let config = parse_config(
            r#"
pipeline:
  output_base_dir: /srv/layers
  raster_selection: largest
"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.output_base_dir, PathBuf::from("/srv/layers"));
        assert_eq!(config.pipeline.raster_selection, RasterSelection::Largest);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_name_contains_selection_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "pipeline:\n  raster_selection:\n    name_contains: vv\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.pipeline.raster_selection,
            RasterSelection::NameContains("vv".to_string())
        );

        fs::write(&path, "pipeline:\n  raster_selection: { name_contains: vh }\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.pipeline.raster_selection,
            RasterSelection::NameContains("vh".to_string())
        );
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "logging:\n  format: xml\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = PipelineConfig::default();
        let overrides = PipelineOverrides {
            input: Some(PathBuf::from("/in/a.zip")),
            zoom: Some(ZoomRange::new(8, 12).unwrap()),
            processes: Some(2),
            timeout_secs: Some(60),
            ..Default::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.input_archive_path, PathBuf::from("/in/a.zip"));
        assert_eq!(config.zoom_range.to_string(), "8-12");
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.tool_timeout_secs, 60);
        assert_eq!(config.output_base_dir, PathBuf::from("src/data/nasa-layers"));
        assert!(!config.cleanup_extracted);
    }

    #[test]
    fn test_load_shipped_config() {
        let path = test_utils::service_config_dir("ingester").join("sar-ingester.yaml");
        let config = load_config(Some(&path)).unwrap();
        config.pipeline.validate().unwrap();
        assert_eq!(config.pipeline.zoom_range.to_string(), "10-15");
        assert_eq!(config.pipeline.layer.colormap, "sar-intensity");
    }
}
