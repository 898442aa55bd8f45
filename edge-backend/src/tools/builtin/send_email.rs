//! Send email tool. Delivers through an HTTP email relay when one is
//! configured, otherwise reports what would have been sent.

use crate::http::shared_client;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

pub struct SendEmailTool {
    definition: ToolDefinition,
}

impl SendEmailTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "to".to_string(),
            PropertySchema::string_array("Recipient address, or a list of addresses"),
        );
        properties.insert("subject".to_string(), PropertySchema::string("Subject line"));
        properties.insert("body".to_string(), PropertySchema::string("Plain-text body"));
        properties.insert(
            "cc".to_string(),
            PropertySchema::string_array("Optional CC addresses"),
        );

        SendEmailTool {
            definition: ToolDefinition {
                name: "send_email".to_string(),
                description: "Send a plain-text email on behalf of the founding team.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["to", "subject", "body"]),
                group: ToolGroup::Communication,
            },
        }
    }
}

impl Default for SendEmailTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        let list = match self {
            Recipients::One(s) => s.split(',').map(str::to_string).collect(),
            Recipients::Many(v) => v,
        };
        list.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SendEmailParams {
    to: Recipients,
    subject: String,
    body: String,
    cc: Option<Recipients>,
}

#[async_trait]
impl Tool for SendEmailTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: SendEmailParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let to = params.to.into_vec();
        let cc = params.cc.map(Recipients::into_vec).unwrap_or_default();
        if to.is_empty() {
            return ToolResult::invalid_params("At least one recipient is required");
        }
        if let Some(bad) = to.iter().chain(cc.iter()).find(|addr| !looks_like_address(addr)) {
            return ToolResult::invalid_params(format!("Invalid email address: {}", bad));
        }

        let Some(relay) = context.settings.email.as_ref() else {
            return ToolResult::success(format!(
                "[send_email stub] Email relay not configured - would send email to {} with subject '{}'.",
                to.join(", "),
                params.subject
            ))
            .with_metadata(json!({"delivered": false}));
        };

        let payload = json!({
            "from": relay.from,
            "to": to,
            "cc": cc,
            "subject": params.subject,
            "text": params.body,
        });

        let response = shared_client()
            .post(&relay.api_url)
            .bearer_auth(&relay.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(20))
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => {
                log::info!("[TOOLS] send_email delivered to {} recipient(s)", to.len() + cc.len());
                ToolResult::success(format!("Email sent to {}", to.join(", ")))
                    .with_metadata(json!({"delivered": true}))
            }
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                ToolResult::failure(
                    ToolErrorKind::Upstream,
                    format!("Email relay error: {} - {}", status, body),
                )
            }
            Err(e) => ToolResult::failure(ToolErrorKind::Upstream, format!("Failed to send email: {}", e)),
        }
    }
}

fn looks_like_address(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !addr.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_when_unconfigured() {
        let result = SendEmailTool::new()
            .execute(
                json!({"to": "investor@example.com", "subject": "Update", "body": "Hi"}),
                &ToolContext::default(),
            )
            .await;
        assert!(result.success);
        assert!(result.content.starts_with("[send_email stub]"));
        assert!(result.content.contains("investor@example.com"));
        assert!(result.content.contains("'Update'"));
    }

    #[tokio::test]
    async fn test_accepts_recipient_lists() {
        let result = SendEmailTool::new()
            .execute(
                json!({"to": ["a@example.com", "b@example.com"], "subject": "s", "body": "b"}),
                &ToolContext::default(),
            )
            .await;
        assert!(result.content.contains("a@example.com, b@example.com"));
    }

    #[tokio::test]
    async fn test_rejects_bad_addresses() {
        let result = SendEmailTool::new()
            .execute(
                json!({"to": "not-an-address", "subject": "s", "body": "b"}),
                &ToolContext::default(),
            )
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));

        let result = SendEmailTool::new()
            .execute(json!({"to": [], "subject": "s", "body": "b"}), &ToolContext::default())
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));
    }
}
