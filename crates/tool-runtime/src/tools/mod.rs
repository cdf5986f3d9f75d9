//! Disruption-engine tools.
//!
//! - `detect_container_disruption`: scan machines x KPIs for disrupted containers
//! - `find_disruption_source`: rank co-located containers for one victim
//! - `render_disruption_report`: markdown table of findings

pub mod detect_disruption;
pub mod disruption_report;
pub mod find_root_cause;

pub use detect_disruption::DetectDisruptionTool;
pub use disruption_report::RenderReportTool;
pub use find_root_cause::FindRootCauseTool;

use serde_json::Value;
use tracing::debug;

use disruptor_compute::{build_loader, DisruptionEngine};
use disruptor_core::{DetectorConfig, LoaderError};

use crate::registry::{RegistryError, ToolRegistry};
use crate::tool::{ToolContext, ToolError};

/// Registry holding every disruption tool, sharing one base config.
pub fn disruption_registry(config: DetectorConfig) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(DetectDisruptionTool::new(config.clone()))?;
    registry.register(FindRootCauseTool::new(config))?;
    registry.register(RenderReportTool)?;
    Ok(registry)
}

/// Build a per-call engine: base config merged with `extra`, loader from its blob.
pub(crate) async fn engine_for(
    base: &DetectorConfig,
    extra: &Value,
    loader: &Value,
    context: &ToolContext,
) -> Result<DisruptionEngine, ToolError> {
    let config = base.with_overrides(extra)?;
    let loader = build_loader(loader, &context.working_directory)
        .await
        .map_err(|e| match e {
            LoaderError::InvalidConfig(msg) => ToolError::InvalidInput(msg),
            other => ToolError::ExecutionFailed(other.to_string()),
        })?;
    debug!(q = config.q, level = config.level, "engine built for tool call");
    Ok(DisruptionEngine::new(loader, config))
}

/// JSON Schema fragment shared by the engine tools.
pub(crate) fn window_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "look_back": {"type": "integer", "minimum": 1, "description": "Minutes of history to fetch"},
            "obs_size": {"type": "integer", "minimum": 1, "description": "Trailing points to score"}
        },
        "required": ["look_back", "obs_size"]
    })
}

pub(crate) fn loader_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "description": "Metric loader config: {\"kind\": \"static\", \"series\": [...], \"step_seconds\": 60} or {\"kind\": \"file\", \"path\": \"metrics.json\"}",
        "properties": {
            "kind": {"type": "string", "enum": ["static", "file"]}
        },
        "required": ["kind"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_tools() {
        let registry = disruption_registry(DetectorConfig::default()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("detect_container_disruption").is_some());
        assert!(registry.get("find_disruption_source").is_some());
        assert!(registry.get("render_disruption_report").is_some());
    }

    #[tokio::test]
    async fn bad_loader_kind_is_invalid_input() {
        let ctx = ToolContext {
            working_directory: std::env::temp_dir(),
        };
        let err = engine_for(
            &DetectorConfig::default(),
            &Value::Null,
            &serde_json::json!({"kind": "prometheus"}),
            &ctx,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn bad_override_is_invalid_input() {
        let ctx = ToolContext {
            working_directory: std::env::temp_dir(),
        };
        let err = engine_for(
            &DetectorConfig::default(),
            &serde_json::json!({"q": 2.0}),
            &serde_json::json!({"kind": "static"}),
            &ctx,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
