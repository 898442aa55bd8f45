//! In-memory store used when no database is configured.
//!
//! Each `MemoryStore` is an independent instance; nothing is process-global.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use super::{new_id, Store, StoreError};
use crate::models::{
    Agent, Company, CompanyUpdate, NewAgent, NewCompany, NewTask, NewUser, Task, TaskStatus,
    TaskUpdate, User,
};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// email -> user id; the entry lock makes the uniqueness check atomic
    user_emails: DashMap<String, String>,
    agents: DashMap<String, Agent>,
    tasks: DashMap<String, Task>,
    companies: DashMap<String, Company>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let email = user.email.trim().to_string();
        let slot = match self.user_emails.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!("email already registered: {}", email)));
            }
            Entry::Vacant(slot) => slot,
        };
        let now = Utc::now();
        let record = User {
            id: new_id(),
            email,
            role: user.role,
            auth_user_id: user.auth_user_id,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(record.id.clone(), record.clone());
        slot.insert(record.id.clone());
        Ok(record)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        if let Some(user) = self.users.get(id) {
            return Ok(Some(user.clone()));
        }
        Ok(self
            .users
            .iter()
            .find(|u| u.auth_user_id.as_deref() == Some(id))
            .map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.user_emails.get(email.trim()).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent, StoreError> {
        let now = Utc::now();
        let record = Agent {
            id: new_id(),
            user_id: agent.user_id,
            role: agent.role,
            conversation_state: agent.conversation_state,
            created_at: now,
            updated_at: now,
        };
        self.agents.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        Ok(self.agents.get(id).map(|a| a.clone()))
    }

    async fn get_agents_by_user(&self, user_id: &str) -> Result<Vec<Agent>, StoreError> {
        let mut agents: Vec<Agent> = self
            .agents
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.clone())
            .collect();
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(agents)
    }

    async fn update_agent_conversation(
        &self,
        agent_id: &str,
        conversation_state: Value,
    ) -> Result<Option<Agent>, StoreError> {
        Ok(self.agents.get_mut(agent_id).map(|mut agent| {
            agent.conversation_state = conversation_state;
            agent.updated_at = Utc::now();
            agent.clone()
        }))
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let record = Task {
            id: new_id(),
            user_id: task.user_id,
            auth_user_id: task.auth_user_id,
            assigned_to_role: task.assigned_to_role,
            description: task.description,
            status: task.status,
            resources: task.resources,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(id).map(|t| t.clone()))
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get_mut(id).map(|mut task| {
            update.apply(&mut task);
            task.clone()
        }))
    }

    async fn get_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.clone())
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tasks.remove(id).is_some())
    }

    async fn create_company(&self, company: NewCompany) -> Result<Company, StoreError> {
        let now = Utc::now();
        let record = Company {
            id: new_id(),
            user_id: company.user_id,
            name: company.name,
            description: company.description,
            industry: company.industry,
            stage: company.stage,
            company_info: company.company_info,
            product_overview: company.product_overview,
            tech_stack: company.tech_stack,
            go_to_market_strategy: company.go_to_market_strategy,
            codebase_files: company.codebase_files,
            created_at: now,
            updated_at: now,
        };
        self.companies.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.get(id).map(|c| c.clone()))
    }

    async fn get_company_by_user(&self, user_id: &str) -> Result<Option<Company>, StoreError> {
        Ok(self
            .companies
            .iter()
            .filter(|c| c.user_id == user_id)
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at))
            .map(|c| c.clone()))
    }

    async fn update_company(
        &self,
        id: &str,
        update: CompanyUpdate,
    ) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.get_mut(id).map(|mut company| {
            update.apply(&mut company);
            company.clone()
        }))
    }
}
