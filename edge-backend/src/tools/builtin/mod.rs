mod calendar;
mod codebase_explorer;
mod create_task;
mod file_manager;
mod read_pdf;
mod scrape_website;
mod send_email;
mod summarize_text;
mod web_search;

pub use calendar::CalendarTool;
pub use codebase_explorer::CodebaseExplorerTool;
pub use create_task::CreateTaskTool;
pub use file_manager::FileManagerTool;
pub use read_pdf::ReadPdfTool;
pub use scrape_website::ScrapeWebsiteTool;
pub use send_email::SendEmailTool;
pub use summarize_text::SummarizeTextTool;
pub use web_search::WebSearchTool;
