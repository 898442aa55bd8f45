//! Task board operations (tasks)

use chrono::Utc;
use rusqlite::OptionalExtension;

use super::super::{new_id, Database, StoreError};
use super::{parse_enum, parse_json, parse_timestamp};
use crate::models::{NewTask, Task, TaskStatus, TaskUpdate};

const TASK_COLUMNS: &str =
    "id, user_id, auth_user_id, assigned_to_role, description, status, resources, created_at, updated_at";

impl Database {
    pub fn insert_task(&self, new_task: &NewTask) -> Result<Task, StoreError> {
        let conn = self.conn()?;
        let now = Utc::now();
        let task = Task {
            id: new_id(),
            user_id: new_task.user_id.clone(),
            auth_user_id: new_task.auth_user_id.clone(),
            assigned_to_role: new_task.assigned_to_role,
            description: new_task.description.clone(),
            status: new_task.status,
            resources: new_task.resources.clone(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO tasks (id, user_id, auth_user_id, assigned_to_role, description, status, resources, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                &task.id,
                &task.user_id,
                &task.auth_user_id,
                task.assigned_to_role.as_ref(),
                &task.description,
                task.status.as_ref(),
                serde_json::to_string(&task.resources)?,
                now.to_rfc3339(),
            ],
        )?;

        Ok(task)
    }

    pub fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                [id],
                Self::row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Newest first
    pub fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([user_id], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Oldest first, so the worker drains in creation order
    pub fn list_tasks_with_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE status = ?1 ORDER BY created_at ASC, rowid ASC",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([status.as_ref()], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Update a task with dynamic fields
    pub fn update_task_fields(&self, id: &str, update: &TaskUpdate) -> Result<Option<Task>, StoreError> {
        let conn = self.conn()?;

        let mut updates = vec!["updated_at = ?1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(Utc::now().to_rfc3339())];

        if let Some(ref description) = update.description {
            params.push(Box::new(description.clone()));
            updates.push(format!("description = ?{}", params.len()));
        }
        if let Some(status) = update.status {
            params.push(Box::new(status.as_ref().to_string()));
            updates.push(format!("status = ?{}", params.len()));
        }
        if let Some(role) = update.assigned_to_role {
            params.push(Box::new(role.as_ref().to_string()));
            updates.push(format!("assigned_to_role = ?{}", params.len()));
        }
        if let Some(ref resources) = update.resources {
            params.push(Box::new(serde_json::to_string(resources)?));
            updates.push(format!("resources = ?{}", params.len()));
        }
        params.push(Box::new(id.to_string()));

        let sql = format!(
            "UPDATE tasks SET {} WHERE id = ?{}",
            updates.join(", "),
            params.len()
        );
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = conn.execute(&sql, params_ref.as_slice())?;

        drop(conn);
        if rows == 0 {
            return Ok(None);
        }
        self.find_task(id)
    }

    pub fn remove_task(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            auth_user_id: row.get(2)?,
            assigned_to_role: parse_enum(3, row.get(3)?)?,
            description: row.get(4)?,
            status: parse_enum(5, row.get(5)?)?,
            resources: parse_json(6, row.get(6)?)?,
            created_at: parse_timestamp(7, row.get(7)?)?,
            updated_at: parse_timestamp(8, row.get(8)?)?,
        })
    }
}
