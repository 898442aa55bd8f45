use crate::tools::types::{ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition for the model API
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the given parameters
    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult;

    fn name(&self) -> String {
        self.definition().name
    }

    fn group(&self) -> ToolGroup {
        self.definition().group
    }

    /// Tools that act inside a tenant workspace get the tenant id injected
    /// into their arguments by the orchestrator.
    fn tenant_scoped(&self) -> bool {
        false
    }
}

/// Name → handler map. Built once at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique; a second registration under the
    /// same name is refused and returns false.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            log::warn!("[TOOLS] refusing duplicate registration of '{}'", name);
            return false;
        }
        self.tools.insert(name, tool);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors sorted by name, so the model sees a stable list.
    pub fn list_descriptors(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool by name. An unknown name is reported in-band.
    pub async fn execute(&self, name: &str, params: Value, context: &ToolContext) -> ToolResult {
        match self.get(name) {
            Some(tool) => tool.execute(params, context).await,
            None => ToolResult::failure(
                ToolErrorKind::ToolNotFound,
                format!("[Error] unknown tool {}", name),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{PropertySchema, ToolInputSchema};
    use serde_json::json;

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            let mut properties = HashMap::new();
            properties.insert("text".to_string(), PropertySchema::string("text to echo"));
            ToolDefinition {
                name: self.name.to_string(),
                description: "Echo the input".to_string(),
                input_schema: ToolInputSchema::object(properties, &["text"]),
                group: ToolGroup::Knowledge,
            }
        }

        async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
            ToolResult::success(params["text"].as_str().unwrap_or_default())
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(EchoTool { name: "echo" })));
        assert!(!registry.register(Arc::new(EchoTool { name: "echo" })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_descriptors_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "zeta" }));
        registry.register(Arc::new(EchoTool { name: "alpha" }));
        let names: Vec<String> = registry.list_descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_execute_known_and_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "echo" }));
        let ctx = ToolContext::new();

        let result = registry.execute("echo", json!({"text": "hi"}), &ctx).await;
        assert!(result.success);
        assert_eq!(result.content, "hi");

        let result = registry.execute("nonexistent_tool", json!({}), &ctx).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ToolErrorKind::ToolNotFound));
        assert!(result.content.contains("unknown tool nonexistent_tool"));
    }
}
