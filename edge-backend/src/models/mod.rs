pub mod agent;
pub mod company;
pub mod role;
pub mod task;
pub mod user;

pub use agent::{Agent, NewAgent};
pub use company::{Company, CompanyUpdate, NewCompany};
pub use role::Role;
pub use task::{NewTask, Task, TaskStatus, TaskUpdate};
pub use user::{NewUser, User};
