use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use disruptor_core::{DetectorConfig, KpiParam, WindowParam};

use crate::tool::{parse_input, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use super::{engine_for, loader_schema, window_schema};

/// Scan containers for disruptions with the Spot detector.
pub struct DetectDisruptionTool {
    config: DetectorConfig,
}

impl DetectDisruptionTool {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Deserialize)]
struct DetectInput {
    kpis: Vec<KpiParam>,
    window: WindowParam,
    #[serde(default)]
    extra: Value,
    loader: Value,
    #[serde(default)]
    machine_id: Option<String>,
}

#[async_trait]
impl Tool for DetectDisruptionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "detect_container_disruption".to_string(),
            description: "Detect disrupted containers: scores the trailing observation window \
                          of every KPI series against its own history and returns the containers \
                          whose alarm ratio reaches the KPI threshold."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "kpis": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "metric": {"type": "string"},
                                "params": {
                                    "type": "object",
                                    "description": "Per-KPI options; outlier_ratio_th defaults to 0.1"
                                }
                            },
                            "required": ["metric"]
                        }
                    },
                    "window": window_schema(),
                    "extra": {
                        "type": "object",
                        "description": "Detector overrides (extra_metrics, q, level, smooth_win, ...)"
                    },
                    "loader": loader_schema(),
                    "machine_id": {
                        "type": "string",
                        "description": "Restrict the scan to one machine; discovered when omitted"
                    }
                },
                "required": ["kpis", "window", "loader"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let input: DetectInput = parse_input(input)?;
        let engine = engine_for(&self.config, &input.extra, &input.loader, context).await?;

        let anomalies = engine
            .detect(&input.kpis, input.window, input.machine_id.as_deref())
            .await?;

        info!(
            kpis = input.kpis.len(),
            machine_id = input.machine_id.as_deref().unwrap_or("*"),
            anomalies = anomalies.len(),
            "detect_container_disruption finished"
        );
        ToolResult::json(&anomalies)
    }
}
