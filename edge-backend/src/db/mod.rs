//! Persistence gateway.
//!
//! [`Store`] is the only way records are created or mutated. Two backends
//! implement it: [`Database`] (SQLite, used when `DATABASE_URL` is set) and
//! [`MemoryStore`] (process-local maps, the fallback).

pub mod memory;
pub mod sqlite;
pub mod tables;

pub use memory::MemoryStore;
pub use sqlite::{Database, DbConn};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::models::{
    Agent, Company, CompanyUpdate, NewAgent, NewCompany, NewTask, NewUser, Task, TaskStatus,
    TaskUpdate, User,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Conflict(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    /// Look a user up by record id or by external auth id.
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent, StoreError>;
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError>;
    async fn get_agents_by_user(&self, user_id: &str) -> Result<Vec<Agent>, StoreError>;
    async fn update_agent_conversation(
        &self,
        agent_id: &str,
        conversation_state: Value,
    ) -> Result<Option<Agent>, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;
    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError>;
    /// All tasks owned by a tenant, newest first.
    async fn get_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError>;
    /// Tasks across all tenants in one status, oldest first.
    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;
    async fn delete_task(&self, id: &str) -> Result<bool, StoreError>;

    async fn create_company(&self, company: NewCompany) -> Result<Company, StoreError>;
    async fn get_company(&self, id: &str) -> Result<Option<Company>, StoreError>;
    async fn get_company_by_user(&self, user_id: &str) -> Result<Option<Company>, StoreError>;
    async fn update_company(
        &self,
        id: &str,
        update: CompanyUpdate,
    ) -> Result<Option<Company>, StoreError>;
}

/// Pick the backend from config: SQLite when a database URL is configured,
/// otherwise the in-memory fallback.
pub fn open_store(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            log::info!("Initializing SQLite store at {}", url);
            Ok(Arc::new(Database::new(url)?))
        }
        None => {
            log::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Behaviour both backends must share, run against each of them.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::models::Role;
    use serde_json::json;

    pub async fn run_all(store: &dyn Store) {
        users(store).await;
        tasks(store).await;
        agents(store).await;
        companies(store).await;
    }

    async fn users(store: &dyn Store) {
        let user = store
            .create_user(NewUser {
                email: "founder@example.com".into(),
                role: Role::Ceo,
                auth_user_id: Some("auth-123".into()),
            })
            .await
            .unwrap();

        assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().email, "founder@example.com");
        assert_eq!(store.get_user("auth-123").await.unwrap().unwrap().id, user.id);
        assert_eq!(
            store.get_user_by_email("founder@example.com").await.unwrap().unwrap().id,
            user.id
        );
        assert!(store.get_user("nobody").await.unwrap().is_none());
    }

    async fn tasks(store: &dyn Store) {
        let task = store
            .create_task(NewTask::pending("tenant-a", Role::Cto, "Design the schema"))
            .await
            .unwrap();
        store
            .create_task(NewTask::pending("tenant-b", Role::Cmo, "Plan the campaign"))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.resources.is_empty());
        assert_eq!(store.get_tasks("tenant-a").await.unwrap().len(), 1);

        let updated = store
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    resources: Some(vec!["completed_tasks/x.md".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.description, "Design the schema");
        assert_eq!(updated.resources, vec!["completed_tasks/x.md".to_string()]);

        let pending = store.list_tasks_by_status(TaskStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, "tenant-b");

        assert!(store
            .update_task("missing", TaskUpdate { status: Some(TaskStatus::Completed), ..Default::default() })
            .await
            .unwrap()
            .is_none());

        assert!(store.delete_task(&task.id).await.unwrap());
        assert!(!store.delete_task(&task.id).await.unwrap());
        assert!(store.get_task(&task.id).await.unwrap().is_none());
    }

    async fn agents(store: &dyn Store) {
        let agent = store
            .create_agent(NewAgent {
                user_id: "tenant-a".into(),
                role: Role::Cmo,
                conversation_state: json!({"messages": []}),
            })
            .await
            .unwrap();

        let updated = store
            .update_agent_conversation(&agent.id, json!({"messages": [], "message_count": 2}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.message_count(), 2);
        assert_eq!(store.get_agents_by_user("tenant-a").await.unwrap().len(), 1);
        assert!(store.get_agent("missing").await.unwrap().is_none());
    }

    async fn companies(store: &dyn Store) {
        let company = store
            .create_company(NewCompany {
                user_id: "tenant-a".into(),
                name: "Acme".into(),
                description: None,
                industry: Some("devtools".into()),
                stage: None,
                company_info: None,
                product_overview: None,
                tech_stack: None,
                go_to_market_strategy: None,
                codebase_files: vec![],
            })
            .await
            .unwrap();

        let updated = store
            .update_company(
                &company.id,
                CompanyUpdate {
                    stage: Some("prototype".into()),
                    codebase_files: Some(vec!["src/main.py".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.stage.as_deref(), Some("prototype"));
        assert_eq!(updated.industry.as_deref(), Some("devtools"));
        assert_eq!(updated.codebase_files, vec!["src/main.py".to_string()]);

        let by_user = store.get_company_by_user("tenant-a").await.unwrap().unwrap();
        assert_eq!(by_user.id, company.id);
    }
}
