use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    /// e.g. idea, prototype, launched
    pub stage: Option<String>,
    pub company_info: Option<String>,
    pub product_overview: Option<String>,
    pub tech_stack: Option<String>,
    pub go_to_market_strategy: Option<String>,
    #[serde(default)]
    pub codebase_files: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub company_info: Option<String>,
    pub product_overview: Option<String>,
    pub tech_stack: Option<String>,
    pub go_to_market_strategy: Option<String>,
    #[serde(default)]
    pub codebase_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub company_info: Option<String>,
    pub product_overview: Option<String>,
    pub tech_stack: Option<String>,
    pub go_to_market_strategy: Option<String>,
    pub codebase_files: Option<Vec<String>>,
}

impl CompanyUpdate {
    pub(crate) fn apply(self, company: &mut Company) {
        if let Some(v) = self.name {
            company.name = v;
        }
        if self.description.is_some() {
            company.description = self.description;
        }
        if self.industry.is_some() {
            company.industry = self.industry;
        }
        if self.stage.is_some() {
            company.stage = self.stage;
        }
        if self.company_info.is_some() {
            company.company_info = self.company_info;
        }
        if self.product_overview.is_some() {
            company.product_overview = self.product_overview;
        }
        if self.tech_stack.is_some() {
            company.tech_stack = self.tech_stack;
        }
        if self.go_to_market_strategy.is_some() {
            company.go_to_market_strategy = self.go_to_market_strategy;
        }
        if let Some(files) = self.codebase_files {
            company.codebase_files = files;
        }
        company.updated_at = Utc::now();
    }
}
