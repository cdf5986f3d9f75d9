use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DisruptorError, Result};

/// Label carrying the host a series was collected on.
pub const MACHINE_ID_LABEL: &str = "machine_id";
/// Label carrying the container a series belongs to.
pub const CONTAINER_NAME_LABEL: &str = "container_name";

/// Default minimum fraction of alarmed test points for an entity to be flagged.
pub const DEFAULT_OUTLIER_RATIO_TH: f64 = 0.1;

pub type Labels = IndexMap<String, String>;

/// One entity's samples for one metric over one window, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub metric: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(metric: impl Into<String>, labels: Labels, values: Vec<f64>) -> Self {
        Self {
            metric: metric.into(),
            labels,
            values,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.label(MACHINE_ID_LABEL)
    }

    pub fn container_name(&self) -> Option<&str> {
        self.label(CONTAINER_NAME_LABEL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Two series describe the same entity when metric and labels match.
    pub fn same_entity(&self, other: &TimeSeries) -> bool {
        self.metric == other.metric && self.labels == other.labels
    }
}

/// A KPI to scan, with free-form per-KPI parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiParam {
    pub metric: String,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

impl KpiParam {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_outlier_ratio_th(mut self, th: f64) -> Self {
        self.params
            .insert("outlier_ratio_th".to_string(), Value::from(th));
        self
    }

    /// `params["outlier_ratio_th"]` as a number; accepts numeric strings.
    pub fn outlier_ratio_th(&self) -> f64 {
        match self.params.get("outlier_ratio_th") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_OUTLIER_RATIO_TH),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_OUTLIER_RATIO_TH),
            _ => DEFAULT_OUTLIER_RATIO_TH,
        }
    }
}

/// Look-back window (minutes) and the trailing observation window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowParam {
    pub look_back: u32,
    pub obs_size: usize,
}

impl WindowParam {
    pub fn new(look_back: u32, obs_size: usize) -> Self {
        Self { look_back, obs_size }
    }

    pub fn validate(&self) -> Result<()> {
        if self.look_back == 0 {
            return Err(DisruptorError::Configuration(
                "window.look_back must be greater than 0".to_string(),
            ));
        }
        if self.obs_size == 0 {
            return Err(DisruptorError::Configuration(
                "window.obs_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build a label map from `(key, value)` pairs.
pub fn labels<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Labels {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlier_ratio_th_defaults() {
        let kpi = KpiParam::new("container_cpu_usage");
        assert_eq!(kpi.outlier_ratio_th(), DEFAULT_OUTLIER_RATIO_TH);
    }

    #[test]
    fn outlier_ratio_th_from_number_or_string() {
        let kpi = KpiParam::new("m").with_outlier_ratio_th(0.3);
        assert_eq!(kpi.outlier_ratio_th(), 0.3);

        let kpi: KpiParam = serde_json::from_value(serde_json::json!({
            "metric": "m",
            "params": {"outlier_ratio_th": "0.25"}
        }))
        .unwrap();
        assert_eq!(kpi.outlier_ratio_th(), 0.25);

        let kpi: KpiParam = serde_json::from_value(serde_json::json!({
            "metric": "m",
            "params": {"outlier_ratio_th": "not-a-number"}
        }))
        .unwrap();
        assert_eq!(kpi.outlier_ratio_th(), DEFAULT_OUTLIER_RATIO_TH);
    }

    #[test]
    fn window_validation() {
        assert!(WindowParam::new(30, 5).validate().is_ok());
        assert!(WindowParam::new(0, 5).validate().is_err());
        assert!(WindowParam::new(30, 0).validate().is_err());
    }

    #[test]
    fn series_label_accessors() {
        let ts = TimeSeries::new(
            "cpu",
            labels([(MACHINE_ID_LABEL, "node-1"), (CONTAINER_NAME_LABEL, "web")]),
            vec![1.0, 2.0],
        );
        assert_eq!(ts.machine_id(), Some("node-1"));
        assert_eq!(ts.container_name(), Some("web"));
        assert_eq!(ts.len(), 2);

        let other = TimeSeries::new("cpu", ts.labels.clone(), vec![]);
        assert!(ts.same_entity(&other));
    }
}
