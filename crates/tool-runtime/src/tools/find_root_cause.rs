use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use disruptor_core::{DetectorConfig, WindowParam};

use crate::tool::{parse_input, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

use super::{engine_for, loader_schema, window_schema};

/// Rank co-located containers whose metric moves with a victim container.
pub struct FindRootCauseTool {
    config: DetectorConfig,
}

impl FindRootCauseTool {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Deserialize)]
struct RootCauseInput {
    metric: String,
    container_name: String,
    window: WindowParam,
    loader: Value,
    #[serde(default)]
    machine_id: Option<String>,
    #[serde(default)]
    extra: Value,
}

#[async_trait]
impl Tool for FindRootCauseTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_disruption_source".to_string(),
            description: "Find containers on the same machine whose metric correlates with \
                          the victim container's; returns at most three, strongest first."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "metric": {"type": "string"},
                    "container_name": {"type": "string", "description": "Victim container"},
                    "window": window_schema(),
                    "loader": loader_schema(),
                    "machine_id": {"type": "string"},
                    "extra": {"type": "object", "description": "Detector overrides"}
                },
                "required": ["metric", "container_name", "window", "loader", "machine_id"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let input: RootCauseInput = parse_input(input)?;
        let engine = engine_for(&self.config, &input.extra, &input.loader, context).await?;

        let causes = engine
            .root_cause(
                &input.metric,
                &input.container_name,
                input.window,
                input.machine_id.as_deref(),
            )
            .await?;

        info!(
            metric = %input.metric,
            container = %input.container_name,
            causes = causes.len(),
            "find_disruption_source finished"
        );
        ToolResult::json(&causes)
    }
}
