//! Fetch a web page and return its readable text.
//!
//! The optional selector supports a tag name, `#id` or `.class`. Matching is
//! done on the raw markup with balanced-tag counting, which is enough for the
//! well-formed pages this tool is pointed at.

use crate::http::shared_client;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const MAX_TEXT_CHARS: usize = 8000;
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

static INVISIBLE_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b.*?</(script|style|noscript|template)\s*>|<!--.*?-->")
        .expect("valid regex")
});
static BLOCK_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(p|div|li|ul|ol|h[1-6]|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>")
        .expect("valid regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\x0B\x0C\r]+").expect("valid regex"));
static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<([a-z][a-z0-9]*)\b([^>]*)>").expect("valid regex"));

pub struct ScrapeWebsiteTool {
    definition: ToolDefinition,
}

impl ScrapeWebsiteTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "url".to_string(),
            PropertySchema::string("Absolute http(s) URL of the page"),
        );
        properties.insert(
            "selector".to_string(),
            PropertySchema::string("Optional element to extract: a tag name, #id or .class"),
        );

        ScrapeWebsiteTool {
            definition: ToolDefinition {
                name: "scrape_website".to_string(),
                description: "Download a web page and return its visible text (truncated to 8000 characters).".to_string(),
                input_schema: ToolInputSchema::object(properties, &["url"]),
                group: ToolGroup::Web,
            },
        }
    }
}

impl Default for ScrapeWebsiteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    url: String,
    selector: Option<String>,
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let params: ScrapeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let url = match url::Url::parse(params.url.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => return ToolResult::invalid_params("url must start with http:// or https://"),
        };

        let response = match shared_client()
            .get(url.clone())
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ToolResult::failure(ToolErrorKind::Upstream, format!("Failed to fetch {}: {}", url, e))
            }
        };
        if !response.status().is_success() {
            return ToolResult::failure(
                ToolErrorKind::Upstream,
                format!("Failed to fetch {}: HTTP {}", url, response.status()),
            );
        }
        let html = match response.text().await {
            Ok(t) => t,
            Err(e) => return ToolResult::failure(ToolErrorKind::Upstream, format!("Failed to read page body: {}", e)),
        };

        match extract_text(&html, params.selector.as_deref()) {
            Ok((text, truncated)) => ToolResult::success(text).with_metadata(json!({
                "url": url.as_str(),
                "truncated": truncated,
            })),
            Err(message) => ToolResult::failure(ToolErrorKind::NotFound, message),
        }
    }
}

/// Visible text of `html`, optionally restricted to the elements matching
/// `selector`. Returns the text and whether it was truncated.
pub(crate) fn extract_text(html: &str, selector: Option<&str>) -> Result<(String, bool), String> {
    let cleaned = INVISIBLE_BLOCKS.replace_all(html, "");

    let source = match selector.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sel) => {
            let fragments = select(&cleaned, sel);
            if fragments.is_empty() {
                return Err(format!("CSS selector '{}' matched no elements on the page", sel));
            }
            fragments.join("\n")
        }
        None => cleaned.into_owned(),
    };

    let text = html_to_text(&source);
    if text.chars().count() > MAX_TEXT_CHARS {
        Ok((text.chars().take(MAX_TEXT_CHARS).collect(), true))
    } else {
        Ok((text, false))
    }
}

fn html_to_text(html: &str) -> String {
    let text = BLOCK_BREAKS.replace_all(html, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

enum Selector<'a> {
    Tag(&'a str),
    Id(&'a str),
    Class(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(raw: &'a str) -> Self {
        if let Some(id) = raw.strip_prefix('#') {
            Selector::Id(id)
        } else if let Some(class) = raw.strip_prefix('.') {
            Selector::Class(class)
        } else {
            Selector::Tag(raw)
        }
    }

    fn matches(&self, tag: &str, attrs: &str) -> bool {
        match self {
            Selector::Tag(name) => tag.eq_ignore_ascii_case(name),
            Selector::Id(id) => attr_value(attrs, "id").is_some_and(|v| v == *id),
            Selector::Class(class) => attr_value(attrs, "class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == *class)),
        }
    }
}

fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(r#"(?i)\b{}\s*=\s*["']([^"']*)["']"#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(attrs).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Inner markup of every top-level element matching `selector`.
fn select(html: &str, selector: &str) -> Vec<String> {
    let selector = Selector::parse(selector);
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = OPEN_TAG.captures_at(html, cursor) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let tag = &caps[1];
        let attrs = &caps[2];
        cursor = whole.end;

        if !selector.matches(tag, attrs) || attrs.trim_end().ends_with('/') {
            continue;
        }
        let inner_start = whole.end;
        match find_closing(html, tag, inner_start) {
            Some((inner_end, after)) => {
                fragments.push(html[inner_start..inner_end].to_string());
                cursor = after;
            }
            None => fragments.push(html[inner_start..].to_string()),
        }
    }
    fragments
}

/// Position of the `</tag>` balancing an element whose content starts at
/// `from`, and the offset just past it.
fn find_closing(html: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let pattern = format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    let mut depth = 1usize;
    for caps in re.captures_iter(&html[from..]) {
        let m = caps.get(0)?;
        let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some((from + m.start(), from + m.end()));
            }
        } else if !m.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}
