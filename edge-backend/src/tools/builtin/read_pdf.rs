//! Read PDF tool - extracts page text from a PDF in the tenant workspace or
//! at an http(s) URL.

use crate::http::shared_client;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolErrorKind, ToolGroup, ToolInputSchema,
    ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const MAX_PDF_BYTES: usize = 20 * 1024 * 1024;

pub struct ReadPdfTool {
    definition: ToolDefinition,
}

impl ReadPdfTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "source".to_string(),
            PropertySchema::string("Workspace path of the PDF, or an http(s) URL"),
        );
        properties.insert(
            "max_pages".to_string(),
            PropertySchema::integer("Maximum number of pages to read").with_default(json!(10)),
        );

        ReadPdfTool {
            definition: ToolDefinition {
                name: "read_pdf".to_string(),
                description: "Extract the text of a PDF document, page by page.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["source"]),
                group: ToolGroup::Knowledge,
            },
        }
    }
}

impl Default for ReadPdfTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ReadPdfParams {
    source: String,
    #[serde(default = "default_max_pages")]
    max_pages: usize,
    tenant_id: Option<String>,
}

fn default_max_pages() -> usize {
    10
}

#[async_trait]
impl Tool for ReadPdfTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn tenant_scoped(&self) -> bool {
        true
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: ReadPdfParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };
        let source = params.source.trim();
        if source.is_empty() {
            return ToolResult::invalid_params("source cannot be empty");
        }

        let bytes = if source.starts_with("http://") || source.starts_with("https://") {
            match download(source).await {
                Ok(b) => b,
                Err(e) => return ToolResult::failure(ToolErrorKind::Upstream, e),
            }
        } else {
            let tenant = match context.tenant_for(params.tenant_id.as_deref()) {
                Ok(t) => t,
                Err(denied) => return denied,
            };
            let workspace = match context.workspace() {
                Ok(w) => w,
                Err(e) => return e,
            };
            match workspace.read_bytes(&tenant, source).await {
                Ok(b) => b,
                Err(e) => return e.into(),
            }
        };

        let max_pages = params.max_pages.max(1);
        let extracted = tokio::task::spawn_blocking(move || extract_pages(&bytes, max_pages)).await;
        match extracted {
            Ok(Ok((text, pages_read, total_pages))) => {
                let content = if text.trim().is_empty() {
                    "[PDF contains no extractable text]".to_string()
                } else {
                    text
                };
                ToolResult::success(content).with_metadata(json!({
                    "pages_read": pages_read,
                    "total_pages": total_pages,
                }))
            }
            Ok(Err(e)) => ToolResult::error(format!("Failed to read PDF: {}", e)),
            Err(e) => ToolResult::error(format!("PDF extraction task failed: {}", e)),
        }
    }
}

async fn download(url: &str) -> Result<Vec<u8>, String> {
    let response = shared_client()
        .get(url)
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .map_err(|e| format!("Failed to download PDF: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("Failed to download PDF: HTTP {}", response.status()));
    }
    if response.content_length().is_some_and(|len| len as usize > MAX_PDF_BYTES) {
        return Err(format!("PDF is larger than {} bytes", MAX_PDF_BYTES));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to download PDF: {}", e))?;
    if bytes.len() > MAX_PDF_BYTES {
        return Err(format!("PDF is larger than {} bytes", MAX_PDF_BYTES));
    }
    Ok(bytes.to_vec())
}

/// Text of the first `max_pages` pages joined by blank lines, plus the
/// number of pages read and the document's page count.
fn extract_pages(bytes: &[u8], max_pages: usize) -> Result<(String, usize, usize), lopdf::Error> {
    let doc = lopdf::Document::load_mem(bytes)?;
    let pages = doc.get_pages();
    let total = pages.len();

    let mut texts = Vec::new();
    for (page_num, _) in pages.iter().take(max_pages) {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => texts.push(text.trim().to_string()),
            Err(e) => log::warn!("[TOOLS] read_pdf could not extract page {}: {}", page_num, e),
        }
    }
    let read = texts.len();
    Ok((texts.join("\n\n"), read, total))
}
