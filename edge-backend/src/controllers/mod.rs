pub mod agents;
pub mod companies;
pub mod files;
pub mod health;
pub mod tasks;
pub mod users;
