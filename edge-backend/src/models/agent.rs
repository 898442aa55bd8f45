use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Role;

/// An AI assistant holding one role for one user. `conversation_state` is a
/// free-form JSON document (message history, topics, company context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub conversation_state: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn message_count(&self) -> u64 {
        self.conversation_state
            .get("message_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn is_active(&self) -> bool {
        self.message_count() > 0
    }

    pub fn topics(&self) -> Vec<String> {
        self.conversation_state
            .get("topics_discussed")
            .and_then(Value::as_array)
            .map(|topics| {
                topics
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct NewAgent {
    pub user_id: String,
    pub role: Role,
    pub conversation_state: Value,
}
