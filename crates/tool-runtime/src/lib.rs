pub mod registry;
pub mod report;
pub mod tool;
pub mod tools;

pub use registry::{RegistryError, ToolRegistry};
pub use report::{Language, MessageKey, ReportRenderer, ReportType};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};
pub use tools::{disruption_registry, DetectDisruptionTool, FindRootCauseTool, RenderReportTool};
