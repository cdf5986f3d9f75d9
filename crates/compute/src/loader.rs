//! Metric loader boundary.
//!
//! The detector never talks to a time-series store directly; it consumes
//! a [`MetricLoader`]. Callers hand over an opaque JSON blob that
//! [`build_loader`] turns into a concrete loader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use disruptor_core::{LoaderError, TimeSeries};

/// Source of per-entity metric series.
#[async_trait]
pub trait MetricLoader: Send + Sync {
    /// All series of `metric` in `[start, end)`, optionally for one machine.
    async fn get_metric(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metric: &str,
        machine_id: Option<&str>,
    ) -> Result<Vec<TimeSeries>, LoaderError>;

    /// Machines reporting any of `metrics`. `Ok(None)` means the backend
    /// cannot answer and the caller should derive machines from labels.
    async fn unique_machines(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _metrics: &[String],
    ) -> Result<Option<Vec<String>>, LoaderError> {
        Ok(None)
    }

    /// Number of samples a complete series over `[start, end)` would hold.
    fn expected_point_length(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize;
}

fn default_step_seconds() -> u64 {
    60
}

/// Inline loader payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPayload {
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u64,
    #[serde(default)]
    pub series: Vec<TimeSeries>,
    /// When present, answers machine discovery directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machines: Option<Vec<String>>,
}

/// Loader configuration blob, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoaderConfig {
    Static(StaticPayload),
    /// JSON file holding a [`StaticPayload`]; relative paths resolve
    /// against the caller's working directory.
    File { path: PathBuf },
}

/// Build a loader from its JSON configuration.
pub async fn build_loader(
    config: &Value,
    base_dir: &Path,
) -> Result<Box<dyn MetricLoader>, LoaderError> {
    let config: LoaderConfig = serde_json::from_value(config.clone())
        .map_err(|e| LoaderError::InvalidConfig(e.to_string()))?;

    let payload = match config {
        LoaderConfig::Static(payload) => payload,
        LoaderConfig::File { path } => {
            let path = if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            };
            debug!(path = %path.display(), "loading metric payload from file");
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&raw).map_err(|e| {
                LoaderError::InvalidConfig(format!("{}: {e}", path.display()))
            })?
        }
    };

    Ok(Box::new(StaticMetricLoader::from_payload(payload)))
}

/// In-memory loader over a fixed set of series; time bounds are ignored
/// when filtering but drive [`MetricLoader::expected_point_length`].
#[derive(Debug, Clone)]
pub struct StaticMetricLoader {
    step_seconds: u64,
    series: Vec<TimeSeries>,
    machines: Option<Vec<String>>,
}

impl StaticMetricLoader {
    pub fn new(series: Vec<TimeSeries>, step_seconds: u64) -> Self {
        Self {
            step_seconds: step_seconds.max(1),
            series,
            machines: None,
        }
    }

    pub fn from_payload(payload: StaticPayload) -> Self {
        let mut loader = Self::new(payload.series, payload.step_seconds);
        loader.machines = payload.machines;
        loader
    }

    /// Answer machine discovery natively instead of via labels.
    pub fn with_machines(mut self, machines: Vec<String>) -> Self {
        self.machines = Some(machines);
        self
    }
}

#[async_trait]
impl MetricLoader for StaticMetricLoader {
    async fn get_metric(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        metric: &str,
        machine_id: Option<&str>,
    ) -> Result<Vec<TimeSeries>, LoaderError> {
        Ok(self
            .series
            .iter()
            .filter(|ts| ts.metric == metric)
            .filter(|ts| machine_id.map_or(true, |m| ts.machine_id() == Some(m)))
            .cloned()
            .collect())
    }

    async fn unique_machines(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _metrics: &[String],
    ) -> Result<Option<Vec<String>>, LoaderError> {
        Ok(self.machines.clone())
    }

    fn expected_point_length(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let secs = (end - start).num_seconds().max(0) as u64;
        (secs / self.step_seconds) as usize
    }
}
