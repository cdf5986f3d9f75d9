use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::series::{Labels, CONTAINER_NAME_LABEL};

/// Entity kind reported for every disruption finding.
pub const CONTAINER_ENTITY: &str = "container";

/// Event source tag attached to findings produced by the Spot detector.
pub const SPOT_EVENT_SOURCE: &str = "spot";

/// A co-located metric that plausibly explains a disruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseModel {
    pub metric: String,
    pub labels: Labels,
    /// Absolute Pearson correlation, rounded to 3 decimals.
    pub score: f64,
}

impl RootCauseModel {
    pub fn container_name(&self) -> Option<&str> {
        self.labels.get(CONTAINER_NAME_LABEL).map(String::as_str)
    }
}

/// Free-form context attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetails {
    pub event_source: String,
    /// Auxiliary-metric trends keyed by metric name (may be empty).
    #[serde(default)]
    pub info: Value,
}

/// One (machine, KPI, container) flagged as disrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModel {
    pub machine_id: String,
    pub metric: String,
    pub labels: Labels,
    /// Fraction of alarmed observation points, in `[0, 1]`.
    pub score: f64,
    pub entity_name: String,
    pub details: AnomalyDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_causes: Vec<RootCauseModel>,
}

impl AnomalyModel {
    pub fn container_name(&self) -> Option<&str> {
        self.labels.get(CONTAINER_NAME_LABEL).map(String::as_str)
    }
}
