use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use disruptor_core::DetectorConfig;

/// CLI configuration loaded from a TOML file.
///
/// ```toml
/// [detector]
/// q = 0.001
/// extra_metrics = "cpu_throttle,mem_rss"
///
/// [loader]
/// kind = "file"
/// path = "metrics.json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Detector settings; when absent they come from `DISRUPTOR_*` env vars.
    #[serde(default)]
    pub detector: Option<DetectorConfig>,

    /// Default loader blob for `detect` / `root-cause`.
    #[serde(default)]
    pub loader: Option<Value>,
}

impl CliConfig {
    /// Return the default config file path: ~/.config/disruptor/config.toml
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("disruptor");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns default config if the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };
        Self::load_from(&config_path)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            debug!(?config_path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!(?config_path, "Loading config");
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", config_path.display()))
    }

    /// Detector settings: the `[detector]` table, else the environment.
    pub fn detector_config(&self) -> DetectorConfig {
        self.detector.clone().unwrap_or_else(DetectorConfig::from_env)
    }

    /// Loader blob: a `--loader` file wins over the config file's `[loader]`.
    pub fn resolve_loader(&self, cli_override: Option<&Path>) -> Result<Value> {
        if let Some(path) = cli_override {
            return Ok(serde_json::json!({ "kind": "file", "path": path }));
        }
        match &self.loader {
            Some(loader) => Ok(loader.clone()),
            None => bail!("no metric loader configured: pass --loader or add a [loader] table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.detector.is_none());
        assert!(config.loader.is_none());
    }

    #[test]
    fn parses_detector_and_loader_tables() {
        let file = write_config(
            r#"
[detector]
q = 0.01
extra_metrics = "cpu_throttle, mem_rss"

[loader]
kind = "file"
path = "metrics.json"
"#,
        );
        let config = CliConfig::load(Some(file.path())).unwrap();

        let detector = config.detector_config();
        assert_eq!(detector.q, 0.01);
        assert_eq!(detector.level, 0.98);
        assert_eq!(detector.extra_metrics, vec!["cpu_throttle", "mem_rss"]);

        let loader = config.resolve_loader(None).unwrap();
        assert_eq!(loader["kind"], "file");
        assert_eq!(loader["path"], "metrics.json");
    }

    #[test]
    fn loader_flag_overrides_config() {
        let config = CliConfig {
            detector: None,
            loader: Some(serde_json::json!({"kind": "static", "series": []})),
        };
        let loader = config.resolve_loader(Some(Path::new("/data/today.json"))).unwrap();
        assert_eq!(loader["kind"], "file");
        assert_eq!(loader["path"], "/data/today.json");
    }

    #[test]
    fn no_loader_is_an_error() {
        let err = CliConfig::default().resolve_loader(None).unwrap_err();
        assert!(err.to_string().contains("--loader"));
    }

    #[test]
    fn malformed_file_reports_path() {
        let file = write_config("[detector\nq = ");
        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
    }
}
