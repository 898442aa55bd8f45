//! User records (users)

use chrono::Utc;
use rusqlite::OptionalExtension;

use super::super::{new_id, Database, StoreError};
use super::{parse_enum, parse_timestamp};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, email, role, auth_user_id, created_at, updated_at";

impl Database {
    pub fn insert_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let conn = self.conn()?;
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: new_user.email.trim().to_string(),
            role: new_user.role,
            auth_user_id: new_user.auth_user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO users (id, email, role, auth_user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![
                &user.id,
                &user.email,
                user.role.as_ref(),
                &user.auth_user_id,
                now.to_rfc3339(),
            ],
        )?;

        Ok(user)
    }

    /// Match on the record id first, then the external auth id.
    pub fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE id = ?1 OR auth_user_id = ?1
                     ORDER BY CASE WHEN id = ?1 THEN 0 ELSE 1 END LIMIT 1",
                    USER_COLUMNS
                ),
                [id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email.trim()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            role: parse_enum(2, row.get(2)?)?,
            auth_user_id: row.get(3)?,
            created_at: parse_timestamp(4, row.get(4)?)?,
            updated_at: parse_timestamp(5, row.get(5)?)?,
        })
    }
}
