use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Language-model API error with status code information
#[derive(Debug, Clone)]
pub struct AiError {
    pub message: String,
    /// HTTP status code if available
    pub status_code: Option<u16>,
}

impl AiError {
    pub fn new(message: impl Into<String>) -> Self {
        AiError {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        AiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// 429 and gateway-ish 5xx responses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self.status_code, Some(429 | 502 | 503 | 504))
    }
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.status_code {
            write!(f, "[HTTP {}] {}", code, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for AiError {}

impl From<String> for AiError {
    fn from(s: String) -> Self {
        AiError::new(s)
    }
}

impl From<&str> for AiError {
    fn from(s: &str) -> Self {
        AiError::new(s)
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id echoed back with the result
    pub id: String,
    pub name: String,
    /// Always a JSON object; absent or malformed arguments decode to `{}`
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: normalize_arguments(arguments),
        }
    }

    /// Decode the provider's argument string.
    pub fn from_raw(id: impl Into<String>, name: impl Into<String>, raw_arguments: Option<&str>) -> Self {
        let arguments = match raw_arguments.map(str::trim) {
            None | Some("") => Value::Object(Map::new()),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => normalize_arguments(value),
                Err(e) => {
                    log::warn!("Malformed tool arguments ({}), using empty set: {}", e, raw);
                    Value::Object(Map::new())
                }
            },
        };
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

fn normalize_arguments(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        _ => Value::Object(Map::new()),
    }
}

/// Result of one tool execution, sent back to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(tool_call_id: String, content: String) -> Self {
        ToolResponse {
            tool_call_id,
            content,
            is_error: false,
        }
    }

    pub fn error(tool_call_id: String, error: String) -> Self {
        ToolResponse {
            tool_call_id,
            content: error,
            is_error: true,
        }
    }
}

/// One round of tool calls and their responses, replayed on the follow-up request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHistoryEntry {
    /// Assistant text that accompanied the tool calls, if any
    #[serde(default)]
    pub assistant_content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_responses: Vec<ToolResponse>,
}

impl ToolHistoryEntry {
    pub fn new(
        assistant_content: Option<String>,
        tool_calls: Vec<ToolCall>,
        tool_responses: Vec<ToolResponse>,
    ) -> Self {
        ToolHistoryEntry {
            assistant_content,
            tool_calls,
            tool_responses,
        }
    }
}

/// A model reply, decoded once at the provider boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl ModelReply {
    /// Text of the reply; for a tool request, whatever prose came with it.
    pub fn text(&self) -> &str {
        match self {
            ModelReply::Text(text) => text,
            ModelReply::ToolCalls { content, .. } => content.as_deref().unwrap_or(""),
        }
    }
}
