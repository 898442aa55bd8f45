//! File manager tool - read or write a text file inside the tenant workspace

use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct FileManagerTool {
    definition: ToolDefinition,
}

impl FileManagerTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();

        properties.insert(
            "mode".to_string(),
            PropertySchema {
                schema_type: "string".to_string(),
                description: "'read' to load a file, 'write' to create or overwrite one."
                    .to_string(),
                default: None,
                items: None,
                enum_values: Some(vec!["read".to_string(), "write".to_string()]),
            },
        );

        properties.insert(
            "path".to_string(),
            PropertySchema {
                schema_type: "string".to_string(),
                description: "File path relative to your workspace (e.g. 'docs/plan.md')."
                    .to_string(),
                default: None,
                items: None,
                enum_values: None,
            },
        );

        properties.insert(
            "content".to_string(),
            PropertySchema {
                schema_type: "string".to_string(),
                description: "Text to write. Required when mode is 'write'.".to_string(),
                default: None,
                items: None,
                enum_values: None,
            },
        );

        FileManagerTool {
            definition: ToolDefinition {
                name: "file_manager".to_string(),
                description: "Read or write text files in the user's workspace. Paths are relative to the workspace root.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["mode".to_string(), "path".to_string()],
                },
                group: ToolGroup::Filesystem,
            },
        }
    }
}

impl Default for FileManagerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct FileManagerParams {
    mode: String,
    path: String,
    content: Option<String>,
    tenant_id: Option<String>,
}

#[async_trait]
impl Tool for FileManagerTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn tenant_scoped(&self) -> bool {
        true
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: FileManagerParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let tenant = match context.tenant_for(params.tenant_id.as_deref()) {
            Ok(t) => t,
            Err(denied) => return denied,
        };
        let workspace = match context.workspace() {
            Ok(w) => w,
            Err(e) => return e,
        };

        match params.mode.as_str() {
            "read" => match workspace.read_to_string(&tenant, &params.path).await {
                Ok(text) => {
                    let bytes = text.len();
                    ToolResult::success(text).with_metadata(json!({
                        "path": params.path,
                        "bytes": bytes,
                    }))
                }
                Err(e) => e.into(),
            },
            "write" => {
                let Some(content) = params.content else {
                    return ToolResult::invalid_params("content is required when mode is 'write'");
                };
                match workspace.write(&tenant, &params.path, content.as_bytes()).await {
                    Ok(_) => ToolResult::success(format!("File written to {}", params.path))
                        .with_metadata(json!({
                            "path": params.path,
                            "bytes": content.len(),
                        })),
                    Err(e) => e.into(),
                }
            }
            other => ToolResult::invalid_params(format!(
                "Invalid mode '{}'. Must be 'read' or 'write'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::Fixture;
    use crate::tools::types::ToolErrorKind;

    #[tokio::test]
    async fn test_write_then_read() {
        let fx = Fixture::new().await;
        let tool = FileManagerTool::new();

        let result = tool
            .execute(
                json!({"mode": "write", "path": "notes/plan.md", "content": "# Plan"}),
                &fx.context,
            )
            .await;
        assert!(result.success, "{}", result.content);
        assert_eq!(result.content, "File written to notes/plan.md");

        let result = tool
            .execute(json!({"mode": "read", "path": "notes/plan.md"}), &fx.context)
            .await;
        assert!(result.success);
        assert_eq!(result.content, "# Plan");
    }

    #[tokio::test]
    async fn test_write_requires_content() {
        let fx = Fixture::new().await;
        let result = FileManagerTool::new()
            .execute(json!({"mode": "write", "path": "a.txt"}), &fx.context)
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));
    }

    #[tokio::test]
    async fn test_traversal_is_denied() {
        let fx = Fixture::new().await;
        let result = FileManagerTool::new()
            .execute(json!({"mode": "read", "path": "../../etc/passwd"}), &fx.context)
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ToolErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_foreign_tenant_argument_is_denied() {
        let fx = Fixture::new().await;
        let result = FileManagerTool::new()
            .execute(
                json!({"mode": "read", "path": "a.txt", "tenant_id": "someone-else"}),
                &fx.context,
            )
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let fx = Fixture::new().await;
        let result = FileManagerTool::new()
            .execute(json!({"mode": "read", "path": "nope.txt"}), &fx.context)
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_unknown_mode() {
        let fx = Fixture::new().await;
        let result = FileManagerTool::new()
            .execute(json!({"mode": "append", "path": "a.txt"}), &fx.context)
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));
    }
}
