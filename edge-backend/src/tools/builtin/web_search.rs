use crate::http::shared_client;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use moka::sync::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const CACHE_TTL: Duration = Duration::from_secs(600);
const DDG_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

static DDG_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
        .expect("valid regex")
});
static DDG_SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#).expect("valid regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Web search. Uses the Brave API when a key is configured, otherwise the
/// DuckDuckGo HTML endpoint. Successful result sets are cached for ten minutes.
pub struct WebSearchTool {
    definition: ToolDefinition,
    cache: Cache<String, Arc<Vec<SearchHit>>>,
}

impl WebSearchTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "query".to_string(),
            PropertySchema {
                schema_type: "string".to_string(),
                description: "The search query".to_string(),
                default: None,
                items: None,
                enum_values: None,
            },
        );
        properties.insert(
            "max_results".to_string(),
            PropertySchema {
                schema_type: "integer".to_string(),
                description: "Number of results to return (1-10, default: 5)".to_string(),
                default: Some(json!(5)),
                items: None,
                enum_values: None,
            },
        );

        WebSearchTool {
            definition: ToolDefinition {
                name: "search_google".to_string(),
                description: "Search the web. Returns titles, URLs and snippets of the top results.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["query".to_string()],
                },
                group: ToolGroup::Web,
            },
            cache: Cache::builder()
                .max_capacity(256)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchParams {
    query: String,
    #[serde(alias = "count", alias = "num_results")]
    max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: WebSearchParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let query = params.query.trim().to_string();
        if query.is_empty() {
            return ToolResult::invalid_params("query cannot be empty");
        }
        let count = params.max_results.unwrap_or(5).clamp(1, 10) as usize;
        let cache_key = format!("{}:{}", query.to_lowercase(), count);

        if let Some(hits) = self.cache.get(&cache_key) {
            log::debug!("[TOOLS] search_google cache hit for '{}'", query);
            return format_hits(&query, &hits, true);
        }

        let outcome = match context.settings.search_api_key.as_deref() {
            Some(key) => search_brave(&query, count, key).await,
            None => search_duckduckgo(&query, count).await,
        };

        match outcome {
            Ok(hits) => {
                let hits = Arc::new(hits);
                if !hits.is_empty() {
                    self.cache.insert(cache_key, hits.clone());
                }
                format_hits(&query, &hits, false)
            }
            Err(e) => {
                log::warn!("[TOOLS] search_google failed for '{}': {}", query, e);
                ToolResult::failure(ToolErrorKind::Upstream, format!("Search failed: {}", e))
            }
        }
    }
}

fn format_hits(query: &str, hits: &[SearchHit], cached: bool) -> ToolResult {
    if hits.is_empty() {
        return ToolResult::success(format!("No results found for '{}'.", query));
    }
    let formatted = hits
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   URL: {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");
    ToolResult::success(formatted).with_metadata(json!({
        "results": hits,
        "cached": cached,
    }))
}

async fn search_brave(query: &str, count: usize, api_key: &str) -> Result<Vec<SearchHit>, String> {
    let count_param = count.to_string();
    let response = shared_client()
        .get(BRAVE_ENDPOINT)
        .query(&[("q", query), ("count", count_param.as_str())])
        .header("X-Subscription-Token", api_key)
        .header("Accept", "application/json")
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("search API returned {}", response.status()));
    }

    let data: BraveSearchResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(data
        .web
        .map(|w| {
            w.results
                .into_iter()
                .take(count)
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.url,
                    snippet: strip_tags(&r.description),
                })
                .collect()
        })
        .unwrap_or_default())
}

async fn search_duckduckgo(query: &str, count: usize) -> Result<Vec<SearchHit>, String> {
    let response = shared_client()
        .post(DDG_HTML_ENDPOINT)
        .form(&[("q", query)])
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("search endpoint returned {}", response.status()));
    }
    let html = response.text().await.map_err(|e| e.to_string())?;
    Ok(parse_duckduckgo_html(&html, count))
}

pub(crate) fn parse_duckduckgo_html(html: &str, count: usize) -> Vec<SearchHit> {
    let snippets: Vec<String> = DDG_SNIPPET
        .captures_iter(html)
        .map(|c| strip_tags(&c[1]))
        .collect();

    DDG_RESULT
        .captures_iter(html)
        .enumerate()
        .take(count)
        .map(|(i, c)| SearchHit {
            title: strip_tags(&c[2]),
            url: unwrap_redirect(&c[1]),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
        })
        .collect()
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&...`.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    if let Ok(parsed) = url::Url::parse(&absolute) {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
    }
    absolute
}

fn strip_tags(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fmvp&amp;rut=abc">How to build an <b>MVP</b></a>
          <a class="result__snippet" href="x">Ship the <b>smallest</b> thing &amp; learn.</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://direct.example.org/">Direct link</a>
          <a class="result__snippet" href="y">Second snippet</a>
        </div>
    "#;

    #[test]
    fn test_parse_duckduckgo_html() {
        let hits = parse_duckduckgo_html(FIXTURE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "How to build an MVP");
        assert_eq!(hits[0].url, "https://example.com/mvp");
        assert_eq!(hits[0].snippet, "Ship the smallest thing & learn.");
        assert_eq!(hits[1].url, "https://direct.example.org/");
    }

    #[test]
    fn test_parse_respects_count() {
        assert_eq!(parse_duckduckgo_html(FIXTURE, 1).len(), 1);
        assert!(parse_duckduckgo_html("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_format_hits() {
        let hits = parse_duckduckgo_html(FIXTURE, 5);
        let result = format_hits("mvp", &hits, false);
        assert!(result.success);
        assert!(result.content.starts_with("1. How to build an MVP\n   URL: https://example.com/mvp"));
        assert_eq!(result.metadata.unwrap()["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let tool = WebSearchTool::new();
        let result = tool.execute(json!({"query": "  "}), &ToolContext::default()).await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));
    }
}
