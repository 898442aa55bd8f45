//! Create task tool - records a task for the calling tenant, optionally
//! saving a deliverable file into their workspace first.

use crate::models::{NewTask, Role, TaskStatus};
use crate::orchestrator::task_extractor::infer_role;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;

static TS_INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\binterface\s+\w+\s*\{").expect("valid regex"));

pub struct CreateTaskTool {
    definition: ToolDefinition,
}

impl CreateTaskTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();

        properties.insert(
            "description".to_string(),
            PropertySchema::string("What needs to be done. Specific and actionable."),
        );
        properties.insert(
            "assigned_to_role".to_string(),
            PropertySchema::string("Who owns the task. Inferred from the description when omitted.")
                .with_enum(&["CEO", "CTO", "CMO"]),
        );
        properties.insert(
            "status".to_string(),
            PropertySchema::string("Initial status")
                .with_enum(&["pending", "in_progress", "completed"])
                .with_default(json!("pending")),
        );
        properties.insert(
            "resource_content".to_string(),
            PropertySchema::string(
                "Full content of a deliverable (code, document, plan) to save with the task",
            ),
        );
        properties.insert(
            "resource_path".to_string(),
            PropertySchema::string(
                "Workspace path for resource_content. Generated when omitted.",
            ),
        );

        CreateTaskTool {
            definition: ToolDefinition {
                name: "create_task".to_string(),
                description: "Create a task for the founding team. When you produce a deliverable, pass its full content as resource_content so it is saved to the user's workspace.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["description"]),
                group: ToolGroup::Tasks,
            },
        }
    }
}

impl Default for CreateTaskTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CreateTaskParams {
    description: String,
    assigned_to_role: Option<String>,
    status: Option<String>,
    resource_content: Option<String>,
    resource_path: Option<String>,
    tenant_id: Option<String>,
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn tenant_scoped(&self) -> bool {
        true
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: CreateTaskParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let description = params.description.trim().to_string();
        if description.is_empty() {
            return ToolResult::invalid_params("Task description cannot be empty.");
        }

        let role = match params.assigned_to_role.as_deref() {
            Some(raw) => match Role::from_str(raw.trim()) {
                Ok(role) => role,
                Err(_) => {
                    return ToolResult::invalid_params(format!(
                        "Invalid role '{}'. Must be CEO, CTO or CMO.",
                        raw
                    ))
                }
            },
            None => infer_role(&description),
        };

        let status = match params.status.as_deref() {
            Some(raw) => match TaskStatus::from_str(raw.trim()) {
                Ok(status) => status,
                Err(_) => {
                    return ToolResult::invalid_params(format!(
                        "Invalid status '{}'. Must be pending, in_progress or completed.",
                        raw
                    ))
                }
            },
            None => TaskStatus::Pending,
        };

        let tenant = match context.tenant_for(params.tenant_id.as_deref()) {
            Ok(t) => t,
            Err(denied) => return denied,
        };
        let store = match context.store() {
            Ok(s) => s,
            Err(e) => return e,
        };

        let user = match store.get_user(&tenant).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return ToolResult::failure(
                    ToolErrorKind::NotFound,
                    format!("No user found with id: {}", tenant),
                )
            }
            Err(e) => return e.into(),
        };

        let mut resources = Vec::new();
        if let Some(content) = params.resource_content.filter(|c| !c.trim().is_empty()) {
            let path = params
                .resource_path
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| generated_resource_path(&content));
            let workspace = match context.workspace() {
                Ok(w) => w,
                Err(e) => return e,
            };
            if let Err(e) = workspace.write(&user.id, &path, content.as_bytes()).await {
                log::warn!("[TOOLS] create_task could not save resource {}: {}", path, e);
                let mut result = ToolResult::from(e);
                result.content = format!("Failed to create resource file: {}", result.content);
                return result;
            }
            resources.push(path);
        }

        let new_task = NewTask {
            user_id: user.id.clone(),
            auth_user_id: user.auth_user_id.clone(),
            assigned_to_role: role,
            description: description.clone(),
            status,
            resources,
        };

        match store.create_task(new_task).await {
            Ok(task) => {
                let message = match task.resources.first() {
                    Some(path) => format!("Task created and file '{}' saved.", path),
                    None => format!("Task created: {}", task.description),
                };
                ToolResult::success(message).with_metadata(json!({
                    "task_id": task.id,
                    "assigned_to_role": task.assigned_to_role,
                    "resources": task.resources,
                }))
            }
            Err(e) => e.into(),
        }
    }
}

/// `generated/ai_output_<8 hex>.<ext>`, extension sniffed from the content.
fn generated_resource_path(content: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("generated/ai_output_{}{}", &id[..8], detect_extension(content))
}

pub(crate) fn detect_extension(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype html") {
        ".html"
    } else if lower.contains("import react") || lower.contains("react.") {
        ".jsx"
    } else if TS_INTERFACE.is_match(content) {
        ".ts"
    } else if lower.contains("def ") || lower.contains("import ") {
        ".py"
    } else {
        ".txt"
    }
}
