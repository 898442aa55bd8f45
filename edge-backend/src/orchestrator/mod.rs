//! Conversation handling: the tool-calling turn, persona chat with the role
//! agents, and the heuristics both rely on.

pub mod prompts;
pub mod role_chat;
pub mod task_extractor;
pub mod tool_agent;

pub use role_chat::{ChatReply, CompanyContextSuggestion, RoleChat, Suggestion};
pub use task_extractor::{extract_candidates, extract_tasks, infer_role, TaskCandidate};
pub use tool_agent::{with_task_summary, ToolAgent, ToolInvocation, TurnOutcome};

/// Drop a surrounding Markdown code fence (with or without a language tag).
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}
