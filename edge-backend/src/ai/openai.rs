use crate::ai::types::{AiError, ModelReply, ToolCall, ToolHistoryEntry};
use crate::ai::Message;
use crate::config::OpenAiConfig;
use crate::tools::ToolDefinition;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 2000;

/// Client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: ApiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        match header::HeaderValue::from_str(&format!("Bearer {}", config.api_key)) {
            Ok(value) => {
                auth_headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => log::error!("[OPENAI] API key contains invalid header characters"),
        }

        Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, AiError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.into_iter().map(to_api_message).collect(),
            tools: None,
            tool_choice: None,
        };
        let reply = self.send(&request).await?;
        Ok(reply.text().trim().to_string())
    }

    pub async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelReply, AiError> {
        let mut api_messages: Vec<ApiMessage> = messages.into_iter().map(to_api_message).collect();
        api_messages.extend(tool_history_to_messages(&tool_history));

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (
                Some(tools.iter().map(tool_to_api).collect()),
                Some("auto".to_string()),
            )
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: api_messages,
            tools,
            tool_choice,
        };
        self.send(&request).await
    }

    async fn send(&self, request: &ChatRequest) -> Result<ModelReply, AiError> {
        log::debug!("[OPENAI] request with {} messages", request.messages.len());

        let mut last_error: Option<AiError> = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = BASE_DELAY_MS * (1 << (attempt - 1));
                log::warn!(
                    "[OPENAI] Retry attempt {}/{} after {}ms delay",
                    attempt,
                    MAX_RETRIES,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let response = match self
                .client
                .post(&self.endpoint)
                .headers(self.auth_headers.clone())
                .json(request)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("[OPENAI] Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(AiError::new(format!("OpenAI API request failed: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| AiError::new(format!("Failed to read OpenAI response: {}", e)))?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map(|env| env.error.message)
                    .unwrap_or(body);
                let err = AiError::with_status(message, status.as_u16());
                if err.is_retryable() {
                    log::warn!("[OPENAI] Retryable error: {}", err);
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let parsed: ChatResponse = serde_json::from_str(&body)
                .map_err(|e| AiError::new(format!("Failed to parse OpenAI response: {}", e)))?;
            return decode_reply(parsed);
        }

        Err(last_error.unwrap_or_else(|| AiError::new("OpenAI API request failed")))
    }
}

fn to_api_message(message: Message) -> ApiMessage {
    ApiMessage {
        role: message.role.as_str().to_string(),
        content: Some(message.content),
        tool_calls: None,
        tool_call_id: None,
    }
}

fn tool_to_api(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

/// Assistant message carrying the calls, then one `tool` message per response.
fn tool_history_to_messages(history: &[ToolHistoryEntry]) -> Vec<ApiMessage> {
    let mut messages = Vec::new();
    for entry in history {
        messages.push(ApiMessage {
            role: "assistant".to_string(),
            content: entry.assistant_content.clone(),
            tool_calls: Some(
                entry
                    .tool_calls
                    .iter()
                    .map(|call| ApiToolCall {
                        id: call.id.clone(),
                        call_type: function_type(),
                        function: ApiFunctionCall {
                            name: call.name.clone(),
                            arguments: Some(call.arguments.to_string()),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        });
        for response in &entry.tool_responses {
            messages.push(ApiMessage {
                role: "tool".to_string(),
                content: Some(response.content.clone()),
                tool_calls: None,
                tool_call_id: Some(response.tool_call_id.clone()),
            });
        }
    }
    messages
}

fn decode_reply(response: ChatResponse) -> Result<ModelReply, AiError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::new("OpenAI response contained no choices"))?
        .message;

    match message.tool_calls {
        Some(calls) if !calls.is_empty() => Ok(ModelReply::ToolCalls {
            content: message.content.filter(|c| !c.trim().is_empty()),
            calls: calls
                .into_iter()
                .map(|call| {
                    ToolCall::from_raw(call.id, call.function.name, call.function.arguments.as_deref())
                })
                .collect(),
        }),
        _ => Ok(ModelReply::Text(message.content.unwrap_or_default())),
    }
}
