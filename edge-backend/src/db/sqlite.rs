//! SQLite database - connection pool and schema.
//!
//! Record operations live in `tables/`; this file also adapts them to the
//! async [`Store`] trait.

use std::path::Path;

use async_trait::async_trait;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;

use super::{Store, StoreError};
use crate::models::{
    Agent, Company, CompanyUpdate, NewAgent, NewCompany, NewTask, NewUser, Task, TaskStatus,
    TaskUpdate, User,
};

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database and initialize the schema.
    /// `":memory:"` gives a private single-connection database.
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url == ":memory:";
        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).ok();
                }
            }
            SqliteConnectionManager::file(database_url)
        };
        let manager = manager.with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });

        // every pooled :memory: connection would be a separate database
        let max_size = if in_memory { 1 } else { 8 };
        let pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;

        let db = Self { pool };
        db.init()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> Result<DbConn, StoreError> {
        Ok(self.pool.get()?)
    }

    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                role TEXT NOT NULL,
                auth_user_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_auth_user_id ON users(auth_user_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                conversation_state TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agents_user_id ON agents(user_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                auth_user_id TEXT,
                assigned_to_role TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                resources TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                industry TEXT,
                stage TEXT,
                company_info TEXT,
                product_overview TEXT,
                tech_stack TEXT,
                go_to_market_strategy TEXT,
                codebase_files TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_companies_user_id ON companies(user_id)",
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl Store for Database {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.insert_user(&user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.find_user(id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_user_by_email(email)
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent, StoreError> {
        self.insert_agent(&agent)
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        self.find_agent(id)
    }

    async fn get_agents_by_user(&self, user_id: &str) -> Result<Vec<Agent>, StoreError> {
        self.list_agents_for_user(user_id)
    }

    async fn update_agent_conversation(
        &self,
        agent_id: &str,
        conversation_state: Value,
    ) -> Result<Option<Agent>, StoreError> {
        self.set_agent_conversation(agent_id, &conversation_state)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.insert_task(&task)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.find_task(id)
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        self.update_task_fields(id, &update)
    }

    async fn get_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        self.list_tasks_for_user(user_id)
    }

    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        self.list_tasks_with_status(status)
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_task(id)
    }

    async fn create_company(&self, company: NewCompany) -> Result<Company, StoreError> {
        self.insert_company(&company)
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>, StoreError> {
        self.find_company(id)
    }

    async fn get_company_by_user(&self, user_id: &str) -> Result<Option<Company>, StoreError> {
        self.find_company_for_user(user_id)
    }

    async fn update_company(
        &self,
        id: &str,
        update: CompanyUpdate,
    ) -> Result<Option<Company>, StoreError> {
        self.update_company_fields(id, update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::conformance;
    use crate::models::Role;

    #[tokio::test]
    async fn test_sqlite_store_conformance() {
        let db = Database::new(":memory:").unwrap();
        conformance::run_all(&db).await;
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let db = Database::new(":memory:").unwrap();
        let new_user = NewUser {
            email: "dup@example.com".into(),
            role: Role::Cto,
            auth_user_id: None,
        };
        db.create_user(new_user.clone()).await.unwrap();
        assert!(db.create_user(new_user).await.is_err());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/edge.db");
        let path = path.to_str().unwrap();

        let task_id = {
            let db = Database::new(path).unwrap();
            db.create_task(NewTask::pending("tenant", Role::Ceo, "Write the memo"))
                .await
                .unwrap()
                .id
        };

        let db = Database::new(path).unwrap();
        let task = db.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(task.description, "Write the memo");
    }
}
