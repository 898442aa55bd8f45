use crate::ai::types::{AiError, ModelReply, ToolHistoryEntry};
use crate::ai::Message;
use crate::tools::ToolDefinition;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One request the mock received
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub messages: Vec<Message>,
    pub tool_history: Vec<ToolHistoryEntry>,
    pub tool_names: Vec<String>,
}

/// Scripted model: replies are handed out in order, every request is recorded.
pub struct MockAiClient {
    script: Mutex<VecDeque<Result<ModelReply, AiError>>>,
    trace: Mutex<Vec<MockRequest>>,
}

impl MockAiClient {
    pub fn new(script: Vec<Result<ModelReply, AiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            trace: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Ok(ModelReply::Text(r.to_string())))
                .collect(),
        )
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.trace.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.trace.lock().len()
    }

    fn next(&self, request: MockRequest) -> Result<ModelReply, AiError> {
        self.trace.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::new("mock script exhausted")))
    }

    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, AiError> {
        let reply = self.next(MockRequest {
            messages,
            tool_history: Vec::new(),
            tool_names: Vec::new(),
        })?;
        Ok(reply.text().to_string())
    }

    pub async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelReply, AiError> {
        self.next(MockRequest {
            messages,
            tool_history,
            tool_names: tools.into_iter().map(|t| t.name).collect(),
        })
    }
}
