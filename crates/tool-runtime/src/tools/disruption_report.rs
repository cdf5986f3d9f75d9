use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use disruptor_core::AnomalyModel;

use crate::report::{Language, ReportRenderer, ReportType};
use crate::tool::{parse_input, Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Render detection findings as a markdown table.
pub struct RenderReportTool;

#[derive(Debug, Deserialize)]
struct ReportInput {
    anomalies: Vec<AnomalyModel>,
    #[serde(default)]
    report_type: ReportType,
    #[serde(default)]
    language: Language,
}

#[async_trait]
impl Tool for RenderReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "render_disruption_report".to_string(),
            description: "Render disruption findings (output of detect_container_disruption) \
                          as a markdown report."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "anomalies": {"type": "array", "items": {"type": "object"}},
                    "report_type": {"type": "string", "enum": ["normal", "anomaly"]},
                    "language": {"type": "string", "enum": ["en", "zh"]}
                },
                "required": ["anomalies"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let input: ReportInput = parse_input(input)?;
        debug!(
            rows = input.anomalies.len(),
            report_type = ?input.report_type,
            language = ?input.language,
            "rendering disruption report"
        );

        let markdown = ReportRenderer::new()
            .render(&input.anomalies, input.report_type, input.language)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        ToolResult::json(&serde_json::json!({ "markdown": markdown }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_context() -> ToolContext {
        ToolContext {
            working_directory: PathBuf::from("/tmp"),
        }
    }

    #[tokio::test]
    async fn test_render_rows() {
        let input = serde_json::json!({
            "anomalies": [{
                "machine_id": "m1",
                "metric": "cpu",
                "labels": {"machine_id": "m1", "container_name": "web"},
                "score": 0.4,
                "entity_name": "container",
                "details": {"event_source": "spot", "info": {}}
            }],
            "report_type": "normal"
        });
        let result = RenderReportTool.execute(input, &test_context()).await.unwrap();
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        let md = parsed["markdown"].as_str().unwrap();
        assert!(md.contains("| m1 | cpu | 0.400 | web | {} | - |"));
    }

    #[tokio::test]
    async fn test_unknown_report_type() {
        let err = RenderReportTool
            .execute(
                serde_json::json!({"anomalies": [], "report_type": "weekly"}),
                &test_context(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
