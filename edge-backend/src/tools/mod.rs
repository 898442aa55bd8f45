pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult, ToolSettings,
};

use std::sync::Arc;

/// Registry with every built-in tool
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(builtin::FileManagerTool::new()));
    registry.register(Arc::new(builtin::CodebaseExplorerTool::new()));
    registry.register(Arc::new(builtin::CreateTaskTool::new()));
    registry.register(Arc::new(builtin::WebSearchTool::new()));
    registry.register(Arc::new(builtin::ScrapeWebsiteTool::new()));
    registry.register(Arc::new(builtin::SummarizeTextTool::new()));
    registry.register(Arc::new(builtin::ReadPdfTool::new()));
    registry.register(Arc::new(builtin::SendEmailTool::new()));
    registry.register(Arc::new(builtin::CalendarTool::new()));

    registry
}
