pub mod openai;
pub mod types;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::MockAiClient;
pub use openai::OpenAIClient;
pub use types::{AiError, ModelReply, ToolCall, ToolHistoryEntry, ToolResponse};

use crate::config::Config;
use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Unified model client
pub enum AiClient {
    OpenAI(OpenAIClient),
    #[cfg(test)]
    Mock(MockAiClient),
}

impl AiClient {
    /// `None` when no credentials are configured (offline mode).
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .openai
            .as_ref()
            .map(|openai| AiClient::OpenAI(OpenAIClient::new(openai)))
    }

    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, AiError> {
        match self {
            AiClient::OpenAI(client) => client.generate_text(messages).await,
            #[cfg(test)]
            AiClient::Mock(client) => client.generate_text(messages).await,
        }
    }

    /// One completion with tool descriptors offered. An empty `tools` list
    /// offers none; `tool_history` replays earlier calls and their results.
    pub async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelReply, AiError> {
        match self {
            AiClient::OpenAI(client) => {
                client
                    .generate_with_tools(messages, tool_history, tools)
                    .await
            }
            #[cfg(test)]
            AiClient::Mock(client) => {
                client
                    .generate_with_tools(messages, tool_history, tools)
                    .await
            }
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            AiClient::OpenAI(client) => client.model(),
            #[cfg(test)]
            AiClient::Mock(_) => "mock",
        }
    }
}
