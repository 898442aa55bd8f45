//! Company profiles (companies)

use chrono::Utc;
use rusqlite::OptionalExtension;

use super::super::{new_id, Database, StoreError};
use super::{parse_json, parse_timestamp};
use crate::models::{Company, CompanyUpdate, NewCompany};

const COMPANY_COLUMNS: &str = "id, user_id, name, description, industry, stage, company_info, \
     product_overview, tech_stack, go_to_market_strategy, codebase_files, created_at, updated_at";

impl Database {
    pub fn insert_company(&self, new_company: &NewCompany) -> Result<Company, StoreError> {
        let now = Utc::now();
        let company = Company {
            id: new_id(),
            user_id: new_company.user_id.clone(),
            name: new_company.name.clone(),
            description: new_company.description.clone(),
            industry: new_company.industry.clone(),
            stage: new_company.stage.clone(),
            company_info: new_company.company_info.clone(),
            product_overview: new_company.product_overview.clone(),
            tech_stack: new_company.tech_stack.clone(),
            go_to_market_strategy: new_company.go_to_market_strategy.clone(),
            codebase_files: new_company.codebase_files.clone(),
            created_at: now,
            updated_at: now,
        };
        self.write_company(&company, true)?;
        Ok(company)
    }

    pub fn find_company(&self, id: &str) -> Result<Option<Company>, StoreError> {
        let conn = self.conn()?;
        let company = conn
            .query_row(
                &format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS),
                [id],
                Self::row_to_company,
            )
            .optional()?;
        Ok(company)
    }

    /// Most recently updated profile for the user
    pub fn find_company_for_user(&self, user_id: &str) -> Result<Option<Company>, StoreError> {
        let conn = self.conn()?;
        let company = conn
            .query_row(
                &format!(
                    "SELECT {} FROM companies WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT 1",
                    COMPANY_COLUMNS
                ),
                [user_id],
                Self::row_to_company,
            )
            .optional()?;
        Ok(company)
    }

    /// Read-modify-write; a company row is small and only its owner edits it.
    pub fn update_company_fields(
        &self,
        id: &str,
        update: CompanyUpdate,
    ) -> Result<Option<Company>, StoreError> {
        let Some(mut company) = self.find_company(id)? else {
            return Ok(None);
        };
        update.apply(&mut company);
        self.write_company(&company, false)?;
        Ok(Some(company))
    }

    fn write_company(&self, company: &Company, insert: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let sql = if insert {
            "INSERT INTO companies (id, user_id, name, description, industry, stage, company_info,
                 product_overview, tech_stack, go_to_market_strategy, codebase_files, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        } else {
            "UPDATE companies SET user_id = ?2, name = ?3, description = ?4, industry = ?5, stage = ?6,
                 company_info = ?7, product_overview = ?8, tech_stack = ?9, go_to_market_strategy = ?10,
                 codebase_files = ?11, created_at = ?12, updated_at = ?13
             WHERE id = ?1"
        };
        conn.execute(
            sql,
            rusqlite::params![
                &company.id,
                &company.user_id,
                &company.name,
                &company.description,
                &company.industry,
                &company.stage,
                &company.company_info,
                &company.product_overview,
                &company.tech_stack,
                &company.go_to_market_strategy,
                serde_json::to_string(&company.codebase_files)?,
                company.created_at.to_rfc3339(),
                company.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            industry: row.get(4)?,
            stage: row.get(5)?,
            company_info: row.get(6)?,
            product_overview: row.get(7)?,
            tech_stack: row.get(8)?,
            go_to_market_strategy: row.get(9)?,
            codebase_files: parse_json(10, row.get(10)?)?,
            created_at: parse_timestamp(11, row.get(11)?)?,
            updated_at: parse_timestamp(12, row.get(12)?)?,
        })
    }
}
