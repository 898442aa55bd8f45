//! One tool-calling turn.
//!
//! A turn makes exactly one or two model calls. The first offers every
//! registered tool; if the model asks for tools they run sequentially, in
//! the order requested, and a second call without tools produces the reply.
//! Tool side effects are not rolled back when the second call fails.
//!
//! [`TurnOutcome::reply`] is the model's final text as returned; the
//! summary of tasks extracted from the user's message is added by the
//! caller with [`with_task_summary`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ai::{AiClient, Message, ModelReply, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::db::Store;
use crate::error::EdgeError;
use crate::orchestrator::prompts::TOOL_AGENT_SYSTEM_PROMPT;
use crate::orchestrator::task_extractor::extract_tasks;
use crate::tools::{ToolContext, ToolRegistry, ToolResult, ToolSettings};
use crate::workspace::WorkspaceResolver;

/// A tool call made during the turn and what it returned.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_invocations: Vec<ToolInvocation>,
    /// Descriptions of tasks created from the user's message
    pub auto_tasks: Vec<String>,
    pub model_calls: usize,
}

pub struct ToolAgent {
    ai: Option<Arc<AiClient>>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn Store>,
    workspace: Arc<WorkspaceResolver>,
    settings: ToolSettings,
}

impl ToolAgent {
    pub fn new(
        ai: Option<Arc<AiClient>>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn Store>,
        workspace: Arc<WorkspaceResolver>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            ai,
            registry,
            store,
            workspace,
            settings,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one turn for `tenant_id`. Tool failures stay in-band; a model
    /// failure ends the turn with an error.
    pub async fn chat(&self, tenant_id: &str, message: &str) -> Result<TurnOutcome, EdgeError> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(EdgeError::InvalidTenant);
        }
        let ai = self.ai.clone().ok_or(EdgeError::ModelUnavailable)?;

        let context = ToolContext::new()
            .with_tenant(tenant_id)
            .with_workspace(self.workspace.clone())
            .with_store(self.store.clone())
            .with_ai(Some(ai.clone()))
            .with_settings(self.settings.clone());

        let auto_tasks = self.create_extracted_tasks(message, &context).await;

        let messages = vec![
            Message::system(TOOL_AGENT_SYSTEM_PROMPT),
            Message::user(message),
        ];

        let first = ai
            .generate_with_tools(messages.clone(), Vec::new(), self.registry.list_descriptors())
            .await
            .map_err(|e| {
                log::error!("[TOOL_AGENT] first model call failed: {}", e);
                e
            })?;

        let (reply, tool_invocations, model_calls) = match first {
            ModelReply::Text(text) => (text, Vec::new(), 1),
            ModelReply::ToolCalls { content, calls } if calls.is_empty() => {
                (content.unwrap_or_default(), Vec::new(), 1)
            }
            ModelReply::ToolCalls { content, calls } => {
                log::info!(
                    "[TOOL_AGENT] model requested {} tool call(s) for tenant {}",
                    calls.len(),
                    tenant_id
                );
                let invocations = self.dispatch(&calls, tenant_id, &context).await;

                let responses = invocations
                    .iter()
                    .map(|inv| {
                        let payload = json!({ "result": inv.result.content }).to_string();
                        if inv.result.success {
                            ToolResponse::success(inv.call_id.clone(), payload)
                        } else {
                            ToolResponse::error(inv.call_id.clone(), payload)
                        }
                    })
                    .collect();
                let history = vec![ToolHistoryEntry::new(content, calls, responses)];

                let second = ai
                    .generate_with_tools(messages, history, Vec::new())
                    .await
                    .map_err(|e| {
                        log::error!(
                            "[TOOL_AGENT] follow-up model call failed after {} tool call(s): {}",
                            invocations.len(),
                            e
                        );
                        e
                    })?;
                (second.text().to_string(), invocations, 2)
            }
        };

        Ok(TurnOutcome {
            reply,
            tool_invocations,
            auto_tasks,
            model_calls,
        })
    }

    async fn dispatch(
        &self,
        calls: &[ToolCall],
        tenant_id: &str,
        context: &ToolContext,
    ) -> Vec<ToolInvocation> {
        let mut invocations = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments = match self.registry.get(&call.name) {
                Some(tool) if tool.tenant_scoped() => inject_tenant(call.arguments.clone(), tenant_id),
                _ => call.arguments.clone(),
            };

            let result = self.registry.execute(&call.name, arguments.clone(), context).await;
            if result.success {
                log::debug!("[TOOL_AGENT] {} succeeded", call.name);
            } else {
                log::warn!(
                    "[TOOL_AGENT] {} failed ({}): {}",
                    call.name,
                    result
                        .error_kind
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "error".to_string()),
                    result.content
                );
            }

            invocations.push(ToolInvocation {
                call_id: call.id.clone(),
                name: call.name.clone(),
                arguments,
                result,
            });
        }
        invocations
    }

    /// Record the action items found in the user's message as pending tasks.
    /// Returns the descriptions that were stored.
    async fn create_extracted_tasks(&self, message: &str, context: &ToolContext) -> Vec<String> {
        let candidates = extract_tasks(message);
        if candidates.is_empty() || !self.registry.has_tool("create_task") {
            return Vec::new();
        }

        let mut created = Vec::new();
        for candidate in candidates {
            let params = json!({
                "description": candidate.description,
                "assigned_to_role": candidate.role,
                "status": "pending",
            });
            let result = self.registry.execute("create_task", params, context).await;
            if result.success {
                created.push(candidate.description);
            } else {
                log::warn!(
                    "[TOOL_AGENT] could not record extracted task '{}': {}",
                    candidate.description,
                    result.content
                );
            }
        }
        created
    }
}

/// Add the trusted tenant id without overwriting a value the model supplied.
/// A disagreeing value is left in place for the tool to reject.
fn inject_tenant(arguments: Value, tenant_id: &str) -> Value {
    let mut map = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.entry("tenant_id")
        .or_insert_with(|| Value::String(tenant_id.to_string()));
    Value::Object(map)
}

/// Reply text with a bullet list of the tasks created for this turn.
pub fn with_task_summary(reply: &str, tasks: &[String]) -> String {
    let reply = reply.trim();
    if tasks.is_empty() {
        return reply.to_string();
    }
    let bullets = tasks
        .iter()
        .map(|t| format!("\u{2022} {}", t))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\nI've added the following tasks:\n{}", reply, bullets)
}
