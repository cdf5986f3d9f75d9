use std::collections::btree_map::{BTreeMap, Entry};
use std::sync::Arc;

use crate::tool::{Tool, ToolDefinition};

/// Name-indexed set of tools served to remote callers, kept in name order.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Fails on a name clash; the first registration stays.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.definition().name;
        match self.tools.entry(name) {
            Entry::Occupied(slot) => Err(RegistryError::DuplicateName(slot.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(tool));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DetectDisruptionTool, RenderReportTool};
    use disruptor_core::DetectorConfig;

    #[test]
    fn lookup_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(RenderReportTool).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("render_disruption_report").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(RenderReportTool).unwrap();
        let err = registry.register(RenderReportTool).unwrap_err();
        assert!(err.to_string().contains("render_disruption_report"));
    }

    #[test]
    fn list_is_name_ordered() {
        let mut registry = ToolRegistry::new();
        registry.register(RenderReportTool).unwrap();
        registry
            .register(DetectDisruptionTool::new(DetectorConfig::default()))
            .unwrap();

        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["detect_container_disruption", "render_disruption_report"]);
    }
}
