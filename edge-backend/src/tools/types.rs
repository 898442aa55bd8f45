use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ai::AiClient;
use crate::config::{Config, EmailConfig};
use crate::db::{Store, StoreError};
use crate::workspace::{WorkspaceError, WorkspaceResolver};

/// Capability groups, used to organise the tool list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    Filesystem,
    Tasks,
    Web,
    Knowledge,
    Communication,
}

/// JSON-schema fragment for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn new(schema_type: &str, description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.into(),
            default: None,
            items: None,
            enum_values: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new("string", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new("integer", description)
    }

    pub fn string_array(description: impl Into<String>) -> Self {
        PropertySchema {
            items: Some(Box::new(Self::new("string", "item"))),
            ..Self::new("array", description)
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    pub fn object(properties: HashMap<String, PropertySchema>, required: &[&str]) -> Self {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Immutable descriptor handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
    pub group: ToolGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    ToolNotFound,
    InvalidTenant,
    AccessDenied,
    NotFound,
    Execution,
    Persistence,
    Upstream,
}

/// Outcome of a tool execution. Failures are values, never panics, so a
/// failing tool cannot take the conversation down with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: content.into(),
            error_kind: None,
            metadata: None,
        }
    }

    /// Generic execution failure
    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(ToolErrorKind::Execution, message)
    }

    pub fn failure(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: message.into(),
            error_kind: Some(kind),
            metadata: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::failure(ToolErrorKind::InvalidParams, message)
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl From<WorkspaceError> for ToolResult {
    fn from(err: WorkspaceError) -> Self {
        let kind = match err {
            WorkspaceError::InvalidTenant => ToolErrorKind::InvalidTenant,
            WorkspaceError::AccessDenied(_) => ToolErrorKind::AccessDenied,
            WorkspaceError::NotFound(_) => ToolErrorKind::NotFound,
            WorkspaceError::TooLarge { .. } | WorkspaceError::NotText(_) => ToolErrorKind::InvalidParams,
            WorkspaceError::Io(_) => ToolErrorKind::Execution,
        };
        ToolResult::failure(kind, err.to_string())
    }
}

impl From<StoreError> for ToolResult {
    fn from(err: StoreError) -> Self {
        ToolResult::failure(ToolErrorKind::Persistence, err.to_string())
    }
}

/// Tool-relevant slice of the process configuration
#[derive(Debug, Clone, Default)]
pub struct ToolSettings {
    pub email: Option<EmailConfig>,
    pub search_api_key: Option<String>,
}

impl From<&Config> for ToolSettings {
    fn from(config: &Config) -> Self {
        ToolSettings {
            email: config.email.clone(),
            search_api_key: config.search_api_key.clone(),
        }
    }
}

/// Everything a tool may touch during one invocation. `tenant_id` is set by
/// the server from the authenticated caller, never from model output.
#[derive(Clone, Default)]
pub struct ToolContext {
    pub tenant_id: Option<String>,
    pub workspace: Option<Arc<WorkspaceResolver>>,
    pub store: Option<Arc<dyn Store>>,
    pub ai: Option<Arc<AiClient>>,
    pub settings: ToolSettings,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_workspace(mut self, workspace: Arc<WorkspaceResolver>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_ai(mut self, ai: Option<Arc<AiClient>>) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_settings(mut self, settings: ToolSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The tenant this call acts for. A `tenant_id` argument may restate the
    /// trusted tenant but never replace it.
    pub fn tenant_for(&self, requested: Option<&str>) -> Result<String, ToolResult> {
        let tenant = self
            .tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ToolResult::failure(
                    ToolErrorKind::InvalidTenant,
                    "A tenant id is required to use this tool",
                )
            })?;

        match requested.map(str::trim) {
            Some(other) if !other.is_empty() && other != tenant => Err(ToolResult::failure(
                ToolErrorKind::AccessDenied,
                "Access to another tenant's workspace is not allowed",
            )),
            _ => Ok(tenant.to_string()),
        }
    }

    pub fn workspace(&self) -> Result<&WorkspaceResolver, ToolResult> {
        self.workspace
            .as_deref()
            .ok_or_else(|| ToolResult::error("Workspace is not available in this context"))
    }

    pub fn store(&self) -> Result<&dyn Store, ToolResult> {
        self.store
            .as_deref()
            .ok_or_else(|| ToolResult::error("Task store is not available in this context"))
    }
}
