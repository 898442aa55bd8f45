//! Heuristic action-item extraction.
//!
//! Pulls follow-up tasks out of free text so they get recorded even when the
//! model never calls `create_task`. Pure and deterministic: persisting the
//! candidates is up to the caller.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Role;

static FRAGMENT_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\band\b|[\n\u{2022}]").expect("valid regex"));

static MODAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(need to|should|must|have to|please)\b").expect("valid regex")
});

static MODAL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(I|we)?\s*(need to|should|must|have to|please)\s*").expect("valid regex")
});

static IMPERATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:also\s+|then\s+)?(update|gather|create|build|write|design|implement|fix)\b")
        .expect("valid regex")
});

static CTO_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(ui|interface|frontend|design)").expect("valid regex"));

static CMO_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(marketing|feedback|survey|campaign)").expect("valid regex")
});

/// A task the extractor believes the text asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCandidate {
    pub description: String,
    pub role: Role,
}

/// Candidate task descriptions found in `text`, in order of appearance.
pub fn extract_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for fragment in FRAGMENT_SPLIT.split(text) {
        let fragment = fragment.trim_matches(|c: char| c.is_whitespace() || c == '.');
        if fragment.is_empty() {
            continue;
        }

        if MODAL.is_match(fragment) {
            let stripped = MODAL_PREFIX.replace(fragment, "");
            let stripped = stripped.trim();
            if !stripped.is_empty() {
                candidates.push(capitalize(stripped));
            }
        } else if IMPERATIVE.is_match(fragment) {
            candidates.push(capitalize(fragment));
        }
    }

    candidates
}

/// Candidates paired with the role that should own them.
pub fn extract_tasks(text: &str) -> Vec<TaskCandidate> {
    extract_candidates(text)
        .into_iter()
        .map(|description| TaskCandidate {
            role: infer_role(&description),
            description,
        })
        .collect()
}

/// Keyword routing: interface/design work goes to the CTO, marketing and
/// customer research to the CMO, everything else to the CEO. Keywords match
/// at word starts, so "build" is not read as "ui".
pub fn infer_role(description: &str) -> Role {
    if CTO_KEYWORDS.is_match(description) {
        Role::Cto
    } else if CMO_KEYWORDS.is_match(description) {
        Role::Cmo
    } else {
        Role::Ceo
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
