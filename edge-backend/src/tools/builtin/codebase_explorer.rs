//! Codebase explorer - list, analyze, search and summarize the files in a
//! tenant workspace.
//!
//! The walk never follows symlinks, so a link inside the workspace cannot
//! expose anything outside it.

use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MAX_LISTED_FILES: usize = 200;
const MAX_SEARCH_FILES: usize = 10;
const MAX_LINES_PER_FILE: usize = 3;
const MAX_SEARCH_FILE_BYTES: u64 = 1024 * 1024;

const SEARCHABLE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "html", "css", "md", "txt", "json", "yaml", "yml", "xml",
    "sql", "rs", "toml",
];

pub struct CodebaseExplorerTool {
    definition: ToolDefinition,
}

impl CodebaseExplorerTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "action".to_string(),
            PropertySchema::string(
                "'list' files, 'analyze' structure, 'search' for a pattern, or 'summary' of the project",
            )
            .with_enum(&["list", "analyze", "search", "summary"])
            .with_default(json!("list")),
        );
        properties.insert(
            "path".to_string(),
            PropertySchema::string("Directory inside the workspace to explore. Defaults to the root."),
        );
        properties.insert(
            "pattern".to_string(),
            PropertySchema::string("Text to search for (case-insensitive). Used by 'search'."),
        );
        properties.insert(
            "file_types".to_string(),
            PropertySchema::string_array("Only include files with these extensions, e.g. [\"py\", \"md\"]"),
        );

        CodebaseExplorerTool {
            definition: ToolDefinition {
                name: "codebase_explorer".to_string(),
                description: "Explore the files the user has uploaded to their workspace: list them, analyze languages and sizes, search their contents, or summarize the project type.".to_string(),
                input_schema: ToolInputSchema::object(properties, &["action"]),
                group: ToolGroup::Filesystem,
            },
        }
    }
}

impl Default for CodebaseExplorerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerParams {
    #[serde(default = "default_action")]
    action: String,
    #[serde(default)]
    path: String,
    pattern: Option<String>,
    file_types: Option<Vec<String>>,
    tenant_id: Option<String>,
}

fn default_action() -> String {
    "list".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    List,
    Analyze,
    Search,
    Summary,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Action::List),
            "analyze" => Some(Action::Analyze),
            "search" => Some(Action::Search),
            "summary" => Some(Action::Summary),
            _ => None,
        }
    }
}

#[async_trait]
impl Tool for CodebaseExplorerTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn tenant_scoped(&self) -> bool {
        true
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: ExplorerParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::invalid_params(format!("Invalid parameters: {}", e)),
        };

        let Some(action) = Action::parse(&params.action) else {
            return ToolResult::invalid_params(format!(
                "Invalid action '{}'. Must be one of: list, analyze, search, summary.",
                params.action
            ));
        };

        let pattern = params.pattern.unwrap_or_default();
        if action == Action::Search && pattern.trim().is_empty() {
            return ToolResult::invalid_params("Please provide a search pattern.");
        }

        let tenant = match context.tenant_for(params.tenant_id.as_deref()) {
            Ok(t) => t,
            Err(denied) => return denied,
        };
        let workspace = match context.workspace() {
            Ok(w) => w,
            Err(e) => return e,
        };
        let base = match workspace.resolve(&tenant, &params.path) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        if !base.is_dir() {
            return ToolResult::success("No files found in the workspace yet. Upload files to get started.");
        }

        let filter: Option<Vec<String>> = params.file_types.map(|types| {
            types
                .iter()
                .map(|t| t.trim_start_matches('.').to_lowercase())
                .collect()
        });

        let outcome = tokio::task::spawn_blocking(move || {
            let files = collect_files(&base, filter.as_deref());
            match action {
                Action::List => list_files(&files),
                Action::Analyze => format_analysis(&analyze(&files)),
                Action::Search => search_files(&files, &pattern),
                Action::Summary => summarize(&files),
            }
        })
        .await;

        match outcome {
            Ok(text) => ToolResult::success(text),
            Err(e) => ToolResult::error(format!("Codebase exploration failed: {}", e)),
        }
    }
}

struct FileEntry {
    /// Path relative to the explored directory, `/`-separated
    relative: String,
    absolute: PathBuf,
    extension: String,
    size: u64,
}

fn collect_files(base: &Path, filter: Option<&[String]>) -> Vec<FileEntry> {
    let mut files = Vec::new();
    for entry in WalkDir::new(base).follow_links(false).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(base) else {
            continue;
        };
        let extension = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(allowed) = filter {
            if !allowed.iter().any(|a| *a == extension) {
                continue;
            }
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(FileEntry {
            relative: relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            absolute: entry.path().to_path_buf(),
            extension,
            size,
        });
    }
    files
}

fn list_files(files: &[FileEntry]) -> String {
    if files.is_empty() {
        return "No files found.".to_string();
    }

    let mut by_dir: BTreeMap<String, Vec<&FileEntry>> = BTreeMap::new();
    for file in files.iter().take(MAX_LISTED_FILES) {
        let dir = match file.relative.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => "root".to_string(),
        };
        by_dir.entry(dir).or_default().push(file);
    }

    let mut out = format!("Found {} files:\n", files.len());
    for (dir, entries) in by_dir {
        out.push_str(&format!("\n{}/\n", dir));
        for file in entries {
            let name = file.relative.rsplit('/').next().unwrap_or(&file.relative);
            out.push_str(&format!("  - {} ({})\n", name, human_size(file.size)));
        }
    }
    if files.len() > MAX_LISTED_FILES {
        out.push_str(&format!("\n... and {} more files.\n", files.len() - MAX_LISTED_FILES));
    }
    out
}

#[derive(Debug, Default)]
struct Analysis {
    total_files: usize,
    directories: usize,
    languages: Vec<(String, usize)>,
    file_types: Vec<(String, usize)>,
    small: usize,
    medium: usize,
    large: usize,
}

fn analyze(files: &[FileEntry]) -> Analysis {
    let mut languages: HashMap<&'static str, usize> = HashMap::new();
    let mut file_types: HashMap<String, usize> = HashMap::new();
    let mut dirs: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut analysis = Analysis {
        total_files: files.len(),
        ..Default::default()
    };

    for file in files {
        if let Some((dir, _)) = file.relative.rsplit_once('/') {
            dirs.insert(dir);
        }
        if let Some(language) = language_for(&file.extension) {
            *languages.entry(language).or_default() += 1;
        }
        let ext = if file.extension.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{}", file.extension)
        };
        *file_types.entry(ext).or_default() += 1;

        match file.size {
            s if s < 1024 => analysis.small += 1,
            s if s < 50 * 1024 => analysis.medium += 1,
            _ => analysis.large += 1,
        }
    }

    analysis.directories = dirs.len();
    analysis.languages = ranked(languages.into_iter().map(|(k, v)| (k.to_string(), v)));
    analysis.file_types = ranked(file_types.into_iter());
    analysis.file_types.truncate(10);
    analysis
}

/// Highest count first, ties by name.
fn ranked(counts: impl Iterator<Item = (String, usize)>) -> Vec<(String, usize)> {
    let mut v: Vec<(String, usize)> = counts.collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

fn format_analysis(a: &Analysis) -> String {
    let mut out = String::from("Codebase analysis\n");
    out.push_str(&format!("Total files: {}\n", a.total_files));
    out.push_str(&format!("Directories: {}\n", a.directories));

    if !a.languages.is_empty() {
        out.push_str("\nLanguages:\n");
        for (lang, count) in &a.languages {
            out.push_str(&format!("  {}: {} files\n", lang, count));
        }
    }
    if !a.file_types.is_empty() {
        out.push_str("\nFile types:\n");
        for (ext, count) in &a.file_types {
            out.push_str(&format!("  {}: {}\n", ext, count));
        }
    }
    out.push_str(&format!(
        "\nFile sizes:\n  small (<1KB): {}\n  medium (<50KB): {}\n  large: {}\n",
        a.small, a.medium, a.large
    ));
    out
}

fn search_files(files: &[FileEntry], pattern: &str) -> String {
    let needle = pattern.to_lowercase();
    let mut matches: Vec<(String, Vec<String>)> = Vec::new();

    for file in files {
        if !SEARCHABLE_EXTENSIONS.contains(&file.extension.as_str()) || file.size > MAX_SEARCH_FILE_BYTES {
            continue;
        }
        let Ok(bytes) = std::fs::read(&file.absolute) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        let hits: Vec<String> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| line.to_lowercase().contains(&needle))
            .take(MAX_LINES_PER_FILE)
            .map(|(i, line)| format!("  Line {}: {}", i + 1, line.trim()))
            .collect();
        if !hits.is_empty() {
            matches.push((file.relative.clone(), hits));
        }
    }

    if matches.is_empty() {
        return format!("No matches found for pattern '{}'", pattern);
    }

    let mut out = format!("Search results for '{}':\n", pattern);
    for (path, hits) in matches.iter().take(MAX_SEARCH_FILES) {
        out.push_str(&format!("\n{}\n", path));
        for hit in hits {
            out.push_str(hit);
            out.push('\n');
        }
    }
    if matches.len() > MAX_SEARCH_FILES {
        out.push_str(&format!(
            "\n... and {} more files with matches.\n",
            matches.len() - MAX_SEARCH_FILES
        ));
    }
    out
}

fn summarize(files: &[FileEntry]) -> String {
    if files.is_empty() {
        return "No files found.".to_string();
    }
    let analysis = analyze(files);
    let project_types = detect_project_types(files);

    let mut out = String::from("Project summary\n");
    if project_types.is_empty() {
        out.push_str("Project type: unknown\n");
    } else {
        out.push_str(&format!("Project type: {}\n", project_types.join(", ")));
    }
    if let Some((lang, _)) = analysis.languages.first() {
        out.push_str(&format!("Primary language: {}\n", lang));
    }
    out.push('\n');
    out.push_str(&format_analysis(&analysis));
    out
}

/// Up to three project kinds, strongest evidence first.
fn detect_project_types(files: &[FileEntry]) -> Vec<String> {
    let names: Vec<&str> = files
        .iter()
        .map(|f| f.relative.rsplit('/').next().unwrap_or(&f.relative))
        .collect();
    let has = |name: &str| names.iter().any(|n| n.eq_ignore_ascii_case(name));
    let count_ext = |ext: &str| files.iter().filter(|f| f.extension == ext).count();

    let mut scores: Vec<(String, usize)> = Vec::new();
    let mut add = |label: &str, score: usize| {
        if score > 0 {
            scores.push((label.to_string(), score));
        }
    };

    add(
        "Python",
        count_ext("py") + [has("requirements.txt"), has("pyproject.toml"), has("setup.py")]
            .iter()
            .filter(|b| **b)
            .count()
            * 3,
    );
    add(
        "Node.js/JavaScript",
        count_ext("js") + if has("package.json") { 3 } else { 0 },
    );
    add("React", count_ext("jsx") + count_ext("tsx"));
    add(
        "Next.js",
        if names.iter().any(|n| n.starts_with("next.config")) { 5 } else { 0 },
    );
    add("Django", if has("manage.py") { 5 } else { 0 });
    add(
        "FastAPI",
        if has("main.py") && has("requirements.txt") { 2 } else { 0 },
    );
    add("Rust", count_ext("rs") + if has("Cargo.toml") { 3 } else { 0 });
    add("Documentation", count_ext("md"));

    scores.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scores.into_iter().take(3).map(|(label, _)| label).collect()
}

fn language_for(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "py" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "tsx" | "jsx" => "React",
        "html" | "htm" => "HTML",
        "css" | "scss" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "sql" => "SQL",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "rb" => "Ruby",
        "sh" => "Shell",
        _ => return None,
    };
    Some(language)
}

fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::Fixture;
    use crate::tools::types::ToolErrorKind;

    async fn seeded() -> Fixture {
        let fx = Fixture::new().await;
        fx.write("main.py", "import os\nprint('hello world')\n").await;
        fx.write("requirements.txt", "fastapi\n").await;
        fx.write("docs/README.md", "# Hello\nTODO: write more\n").await;
        fx.write("web/app.jsx", "export const App = () => <div>Hello</div>;\n").await;
        fx
    }

    #[tokio::test]
    async fn test_list_groups_by_directory() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "list"}), &fx.context)
            .await;
        assert!(result.success, "{}", result.content);
        assert!(result.content.starts_with("Found 4 files:"));
        assert!(result.content.contains("root/"));
        assert!(result.content.contains("docs/"));
        assert!(result.content.contains("main.py"));
    }

    #[tokio::test]
    async fn test_analyze_counts_languages() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "analyze"}), &fx.context)
            .await;
        assert!(result.content.contains("Total files: 4"));
        assert!(result.content.contains("Python: 1 files"));
        assert!(result.content.contains("small (<1KB): 4"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "search", "pattern": "HELLO"}), &fx.context)
            .await;
        assert!(result.content.contains("main.py"));
        assert!(result.content.contains("Line 2:"));
        assert!(result.content.contains("docs/README.md"));

        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "search", "pattern": "zebra"}), &fx.context)
            .await;
        assert_eq!(result.content, "No matches found for pattern 'zebra'");
    }

    #[tokio::test]
    async fn test_search_requires_pattern() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "search"}), &fx.context)
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidParams));
        assert_eq!(result.content, "Please provide a search pattern.");
    }

    #[tokio::test]
    async fn test_summary_detects_python() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "summary"}), &fx.context)
            .await;
        assert!(result.content.contains("Project type: Python"));
    }

    #[tokio::test]
    async fn test_file_type_filter() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "list", "file_types": [".md"]}), &fx.context)
            .await;
        assert!(result.content.starts_with("Found 1 files:"));
    }

    #[tokio::test]
    async fn test_empty_workspace() {
        let fx = Fixture::new().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "list"}), &fx.context)
            .await;
        assert!(result.success);
        assert!(result.content.contains("No files found"));
    }

    #[tokio::test]
    async fn test_path_cannot_escape() {
        let fx = seeded().await;
        let result = CodebaseExplorerTool::new()
            .execute(json!({"action": "list", "path": "../.."}), &fx.context)
            .await;
        assert_eq!(result.error_kind, Some(ToolErrorKind::AccessDenied));
    }
}
