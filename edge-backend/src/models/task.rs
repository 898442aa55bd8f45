use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Owning tenant
    pub user_id: String,
    #[serde(default)]
    pub auth_user_id: Option<String>,
    pub assigned_to_role: Role,
    pub description: String,
    pub status: TaskStatus,
    /// Workspace-relative deliverable paths
    #[serde(default)]
    pub resources: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a task
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub user_id: String,
    #[serde(default)]
    pub auth_user_id: Option<String>,
    pub assigned_to_role: Role,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl NewTask {
    pub fn pending(user_id: impl Into<String>, role: Role, description: impl Into<String>) -> Self {
        NewTask {
            user_id: user_id.into(),
            auth_user_id: None,
            assigned_to_role: role,
            description: description.into(),
            status: TaskStatus::Pending,
            resources: Vec::new(),
        }
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to_role: Option<Role>,
    pub resources: Option<Vec<String>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.status.is_none()
            && self.assigned_to_role.is_none()
            && self.resources.is_none()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(role) = self.assigned_to_role {
            task.assigned_to_role = role;
        }
        if let Some(resources) = self.resources {
            task.resources = resources;
        }
        task.updated_at = Utc::now();
    }
}
