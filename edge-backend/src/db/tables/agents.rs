//! AI agent records (agents)

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde_json::Value;

use super::super::{new_id, Database, StoreError};
use super::{parse_enum, parse_json, parse_timestamp};
use crate::models::{Agent, NewAgent};

const AGENT_COLUMNS: &str = "id, user_id, role, conversation_state, created_at, updated_at";

impl Database {
    pub fn insert_agent(&self, new_agent: &NewAgent) -> Result<Agent, StoreError> {
        let conn = self.conn()?;
        let now = Utc::now();
        let agent = Agent {
            id: new_id(),
            user_id: new_agent.user_id.clone(),
            role: new_agent.role,
            conversation_state: new_agent.conversation_state.clone(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO agents (id, user_id, role, conversation_state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![
                &agent.id,
                &agent.user_id,
                agent.role.as_ref(),
                serde_json::to_string(&agent.conversation_state)?,
                now.to_rfc3339(),
            ],
        )?;

        Ok(agent)
    }

    pub fn find_agent(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        let conn = self.conn()?;
        let agent = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                [id],
                Self::row_to_agent,
            )
            .optional()?;
        Ok(agent)
    }

    pub fn list_agents_for_user(&self, user_id: &str) -> Result<Vec<Agent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agents WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map([user_id], Self::row_to_agent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }

    pub fn set_agent_conversation(
        &self,
        agent_id: &str,
        conversation_state: &Value,
    ) -> Result<Option<Agent>, StoreError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE agents SET conversation_state = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![
                serde_json::to_string(conversation_state)?,
                Utc::now().to_rfc3339(),
                agent_id
            ],
        )?;
        drop(conn);

        if rows == 0 {
            return Ok(None);
        }
        self.find_agent(agent_id)
    }

    fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
        Ok(Agent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            role: parse_enum(2, row.get(2)?)?,
            conversation_state: parse_json(3, row.get(3)?)?,
            created_at: parse_timestamp(4, row.get(4)?)?,
            updated_at: parse_timestamp(5, row.get(5)?)?,
        })
    }
}
