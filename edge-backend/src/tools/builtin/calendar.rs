use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Calendar tool. No calendar backend is wired up, so both modes validate
/// their input and describe the action instead of performing it.
pub struct CalendarTool {
    definition: ToolDefinition,
}

impl CalendarTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "mode".to_string(),
            PropertySchema::string("'create' an event or 'list' a day's events")
                .with_enum(&["create", "list"]),
        );
        properties.insert("title".to_string(), PropertySchema::string("Event title (create)"));
        properties.insert(
            "start_time".to_string(),
            PropertySchema::string("Event start, ISO-8601 e.g. 2025-03-01T15:00:00Z (create)"),
        );
        properties.insert(
            "duration_minutes".to_string(),
            PropertySchema::integer("Event length in minutes (create)").with_default(json!(30)),
        );
        properties.insert("date".to_string(), PropertySchema::string("Day to list, YYYY-MM-DD (list)"));

        CalendarTool {
            definition: ToolDefinition {
                name: "calendar_tool".to_string(),
                description: "Create a calendar event or list the events on a given day.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["mode"]),
                group: ToolGroup::Communication,
            },
        }
    }
}

impl Default for CalendarTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CalendarParams {
    mode: String,
    title: Option<String>,
    start_time: Option<String>,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
    date: Option<String>,
}

fn default_duration() -> u32 {
    30
}

#[async_trait]
impl Tool for CalendarTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let params: CalendarParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        match params.mode.as_str() {
            "create" => {
                let Some(title) = params.title.filter(|t| !t.trim().is_empty()) else {
                    return ToolResult::invalid_params("title is required to create an event");
                };
                let Some(start) = params.start_time else {
                    return ToolResult::invalid_params("start_time is required to create an event");
                };
                if !is_datetime(&start) {
                    return ToolResult::invalid_params(format!(
                        "start_time '{}' is not an ISO-8601 date-time",
                        start
                    ));
                }
                if params.duration_minutes == 0 {
                    return ToolResult::invalid_params("duration_minutes must be positive");
                }
                ToolResult::success(format!(
                    "[calendar_tool stub] Would create event '{}' at {} for {} minutes.",
                    title, start, params.duration_minutes
                ))
            }
            "list" => {
                let Some(date) = params.date else {
                    return ToolResult::invalid_params("date is required to list events");
                };
                if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
                    return ToolResult::invalid_params(format!("date '{}' is not YYYY-MM-DD", date));
                }
                ToolResult::success(format!("[calendar_tool stub] Would list events on {}.", date))
            }
            _ => ToolResult::invalid_params("mode must be 'create' or 'list'"),
        }
    }
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ToolErrorKind;

    #[tokio::test]
    async fn test_create_and_list() {
        let tool = CalendarTool::new();
        let ctx = ToolContext::default();

        let result = tool
            .execute(
                json!({"mode": "create", "title": "Board sync", "start_time": "2025-03-01T15:00:00Z", "duration_minutes": 45}),
                &ctx,
            )
            .await;
        assert_eq!(
            result.content,
            "[calendar_tool stub] Would create event 'Board sync' at 2025-03-01T15:00:00Z for 45 minutes."
        );

        let result = tool.execute(json!({"mode": "list", "date": "2025-03-01"}), &ctx).await;
        assert_eq!(result.content, "[calendar_tool stub] Would list events on 2025-03-01.");
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let tool = CalendarTool::new();
        let ctx = ToolContext::default();

        let result = tool.execute(json!({"mode": "delete"}), &ctx).await;
        assert_eq!(result.content, "mode must be 'create' or 'list'");

        let result = tool
            .execute(json!({"mode": "create", "title": "x", "start_time": "tomorrow"}), &ctx)
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));

        let result = tool.execute(json!({"mode": "list", "date": "03/01/2025"}), &ctx).await;
        assert!(!result.success);
    }
}
