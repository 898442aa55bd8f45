use crate::ai::Message;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct SummarizeTextTool {
    definition: ToolDefinition,
}

impl SummarizeTextTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert("text".to_string(), PropertySchema::string("The text to summarize"));
        properties.insert(
            "max_words".to_string(),
            PropertySchema::integer("Upper bound on summary length in words").with_default(json!(150)),
        );

        SummarizeTextTool {
            definition: ToolDefinition {
                name: "summarize_text".to_string(),
                description: "Summarize a piece of text in at most max_words words.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["text"]),
                group: ToolGroup::Knowledge,
            },
        }
    }
}

impl Default for SummarizeTextTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct SummarizeParams {
    text: String,
    #[serde(default = "default_max_words")]
    max_words: usize,
}

fn default_max_words() -> usize {
    150
}

#[async_trait]
impl Tool for SummarizeTextTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: SummarizeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };
        if params.text.trim().is_empty() {
            return ToolResult::invalid_params("text cannot be empty");
        }
        let max_words = params.max_words.max(1);

        let Some(ai) = context.ai.as_ref() else {
            return ToolResult::success(truncate_words(&params.text, max_words))
                .with_metadata(json!({"model": null}));
        };

        let prompt = format!(
            "You are a helpful assistant that summarizes text. Please summarize the following content in <= {} words:\n\n{}",
            max_words, params.text
        );
        match ai.generate_text(vec![Message::user(prompt)]).await {
            Ok(summary) => ToolResult::success(summary.trim())
                .with_metadata(json!({"model": ai.model_name()})),
            Err(e) => ToolResult::failure(ToolErrorKind::Upstream, format!("Summarization failed: {}", e)),
        }
    }
}

/// First `max_words` words, with an ellipsis when anything was cut.
fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        words.join(" ")
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockAiClient;
    use crate::ai::AiClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_offline_truncates_to_word_budget() {
        let result = SummarizeTextTool::new()
            .execute(
                json!({"text": "one two three four five", "max_words": 3}),
                &ToolContext::default(),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.content, "one two three...");
    }

    #[tokio::test]
    async fn test_uses_model_when_available() {
        let mock = MockAiClient::texts(&["  A short summary.  "]);
        let ai = Arc::new(AiClient::Mock(mock));
        let ctx = ToolContext::default().with_ai(Some(ai.clone()));

        let result = SummarizeTextTool::new()
            .execute(json!({"text": "long text here", "max_words": 10}), &ctx)
            .await;
        assert!(result.success);
        assert_eq!(result.content, "A short summary.");

        let AiClient::Mock(mock) = ai.as_ref() else { unreachable!() };
        let prompt = &mock.requests()[0].messages[0].content;
        assert!(prompt.contains("in <= 10 words"));
        assert!(prompt.ends_with("long text here"));
    }
}
