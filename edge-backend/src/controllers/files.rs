use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::EdgeError;
use crate::models::CompanyUpdate;
use crate::AppState;

/// Largest single file accepted by the upload route.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
/// Text served inline by `/raw`; anything else is sent as an attachment.
const INLINE_TEXT_EXTENSIONS: &[&str] = &["md", "txt", "mmd", "py", "json", "yaml", "yml"];
const INLINE_LIMIT: u64 = 1_000_000;
const AI_READABLE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "html", "css", "md", "txt", "json", "yaml", "yml", "xml",
    "sql", "pdf", "csv",
];

#[derive(Debug, Deserialize)]
struct ListQuery {
    user_id: String,
    subdir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawQuery {
    user_id: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct MkdirRequest {
    user_id: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct AiAccessibleFile {
    path: String,
    #[serde(rename = "type")]
    file_type: String,
    size: u64,
}

/// Files under `dir`, as `/`-separated paths relative to `root`, sorted.
fn walk_files(root: &Path, dir: &Path) -> Vec<(String, u64)> {
    let mut files: Vec<(String, u64)> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            Some((rel, size))
        })
        .collect();
    files.sort();
    files
}

async fn list_files(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, EdgeError> {
    let root = data.workspace.tenant_root(&query.user_id)?;
    let subdir = query.subdir.clone().unwrap_or_default();
    let dir = data.workspace.resolve(&query.user_id, &subdir)?;

    if !dir.is_dir() {
        if subdir.is_empty() {
            // nothing uploaded yet
            return Ok(HttpResponse::Ok().json(Vec::<String>::new()));
        }
        return Err(EdgeError::NotFound("Path not found".to_string()));
    }

    let files = web::block(move || walk_files(&root, &dir))
        .await
        .map_err(|e| EdgeError::Io(std::io::Error::other(e.to_string())))?;
    let paths: Vec<String> = files.into_iter().map(|(path, _)| path).collect();
    Ok(HttpResponse::Ok().json(paths))
}

async fn get_raw(
    data: web::Data<AppState>,
    query: web::Query<RawQuery>,
) -> Result<HttpResponse, EdgeError> {
    let path = data.workspace.resolve(&query.user_id, &query.path)?;
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|_| EdgeError::NotFound("File not found".to_string()))?;
    if !meta.is_file() {
        return Err(EdgeError::NotFound("File not found".to_string()));
    }

    let bytes = data.workspace.read_bytes(&query.user_id, &query.path).await?;
    let ext = extension_of(&path);
    if INLINE_TEXT_EXTENSIONS.contains(&ext.as_str()) && meta.len() < INLINE_LIMIT {
        if let Ok(text) = String::from_utf8(bytes.clone()) {
            return Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(text));
        }
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        ))
        .body(bytes))
}

async fn make_directory(
    data: web::Data<AppState>,
    body: web::Json<MkdirRequest>,
) -> Result<HttpResponse, EdgeError> {
    let path = data.workspace.resolve_for_write(&body.user_id, &body.path)?;
    tokio::fs::create_dir_all(&path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "detail": "Directory created",
        "path": body.path
    })))
}

/// Clean a client-supplied file name into a relative path: `..` sequences
/// are removed and backslashes replaced, empty segments dropped.
fn sanitize_upload_path(filename: &str) -> Option<String> {
    let parts: Vec<String> = filename
        .split('/')
        .map(|part| part.replace("..", "").replace('\\', "_"))
        .filter(|part| !part.is_empty() && part != ".")
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Multipart upload. Form fields: `user_id`, optional `directory`, and any
/// number of files whose names may carry a folder path.
async fn upload_files(
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, EdgeError> {
    let mut user_id: Option<String> = None;
    let mut directory = String::new();
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| EdgeError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or("").to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| EdgeError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(EdgeError::BadRequest(format!(
                    "File exceeds the {} MB upload limit",
                    MAX_UPLOAD_BYTES / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match (name.as_str(), filename) {
            (_, Some(filename)) => files.push((filename, bytes)),
            ("user_id", None) => user_id = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            ("directory", None) => directory = String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => {}
        }
    }

    let user_id = user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EdgeError::BadRequest("user_id is required".to_string()))?;
    if files.is_empty() {
        return Err(EdgeError::BadRequest("No files provided".to_string()));
    }

    let mut uploaded = Vec::new();
    for (filename, bytes) in files {
        let Some(safe) = sanitize_upload_path(&filename) else {
            continue;
        };
        let relative = if directory.is_empty() {
            safe
        } else {
            format!("{}/{}", directory.trim_end_matches('/'), safe)
        };
        let written: PathBuf = data.workspace.write(&user_id, &relative, bytes).await?;
        let display = data
            .workspace
            .relative_display(&user_id, &written)
            .unwrap_or(relative);
        log::info!("[WORKSPACE] uploaded {} for user {}", display, user_id);
        uploaded.push(display);
    }

    record_codebase_files(&data, &user_id, &uploaded).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uploaded_files": uploaded,
        "count": uploaded.len()
    })))
}

/// Merge uploaded paths into the company's `codebase_files`. Best effort.
async fn record_codebase_files(data: &AppState, user_id: &str, uploaded: &[String]) {
    let company = match data.store.get_company_by_user(user_id).await {
        Ok(Some(company)) => company,
        Ok(None) => return,
        Err(e) => {
            log::warn!("Failed to load company for uploaded files: {}", e);
            return;
        }
    };

    let merged: BTreeSet<String> = company
        .codebase_files
        .iter()
        .chain(uploaded.iter())
        .cloned()
        .collect();
    let update = CompanyUpdate {
        codebase_files: Some(merged.into_iter().collect()),
        ..Default::default()
    };
    if let Err(e) = data.store.update_company(&company.id, update).await {
        log::warn!("Failed to update company codebase_files: {}", e);
    }
}

async fn files_summary(
    data: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, EdgeError> {
    let root = data.workspace.tenant_root(&query.user_id)?;
    if !root.is_dir() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "total_files": 0,
            "file_types": {},
            "ai_accessible_count": 0,
            "ai_accessible_files": []
        })));
    }

    let walk_root = root.clone();
    let files = web::block(move || walk_files(&walk_root, &walk_root))
        .await
        .map_err(|e| EdgeError::Io(std::io::Error::other(e.to_string())))?;

    let mut file_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut accessible = Vec::new();
    for (path, size) in &files {
        let ext = extension_of(Path::new(path));
        let key = if ext.is_empty() { String::new() } else { format!(".{}", ext) };
        *file_types.entry(key.clone()).or_default() += 1;
        if AI_READABLE_EXTENSIONS.contains(&ext.as_str()) {
            accessible.push(AiAccessibleFile {
                path: path.clone(),
                file_type: key,
                size: *size,
            });
        }
    }

    let accessible_count = accessible.len();
    accessible.truncate(20);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total_files": files.len(),
        "file_types": file_types,
        "ai_accessible_count": accessible_count,
        "ai_accessible_files": accessible,
        "workspace_tools": [
            "codebase_explorer - analyze project structure and search code",
            "file_manager - read/write individual files",
            "read_pdf - extract text from PDF documents"
        ]
    })))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/files")
            .route("/list", web::get().to(list_files))
            .route("/raw", web::get().to(get_raw))
            .route("/mkdir", web::post().to(make_directory))
            .route("/upload", web::post().to(upload_files))
            .route("/summary", web::get().to(files_summary)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support;
    use crate::models::{NewCompany, NewUser, Role};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_upload_path() {
        assert_eq!(sanitize_upload_path("src/app.py").as_deref(), Some("src/app.py"));
        assert_eq!(sanitize_upload_path("../../etc/passwd").as_deref(), Some("etc/passwd"));
        assert_eq!(sanitize_upload_path("a\\b.txt").as_deref(), Some("a_b.txt"));
        assert_eq!(sanitize_upload_path("./"), None);
    }

    #[actix_web::test]
    async fn test_list_raw_mkdir_and_isolation() {
        let dir = TempDir::new().unwrap();
        let state = test_support::state(&dir, None);
        state.workspace.write("alice", "docs/plan.md", "# Plan").await.unwrap();
        state.workspace.write("alice", "app.py", "print(1)").await.unwrap();
        let app = actix_test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = actix_test::TestRequest::get().uri("/api/files/list?user_id=alice").to_request();
        let files: Vec<String> = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(files, vec!["app.py", "docs/plan.md"]);

        let req = actix_test::TestRequest::get().uri("/api/files/list?user_id=bob").to_request();
        let files: Vec<String> = actix_test::call_and_read_body_json(&app, req).await;
        assert!(files.is_empty());

        let req = actix_test::TestRequest::get()
            .uri("/api/files/raw?user_id=alice&path=docs/plan.md")
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "# Plan");

        let req = actix_test::TestRequest::get()
            .uri("/api/files/raw?user_id=bob&path=docs/plan.md")
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = actix_test::TestRequest::get()
            .uri("/api/files/raw?user_id=bob&path=../alice/app.py")
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::post()
            .uri("/api/files/mkdir")
            .set_json(json!({"user_id": "alice", "path": "assets/img"}))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(state.workspace.resolve("alice", "assets/img").unwrap().is_dir());

        let req = actix_test::TestRequest::get().uri("/api/files/summary?user_id=alice").to_request();
        let summary: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["total_files"], 2);
        assert_eq!(summary["file_types"][".py"], 1);
        assert_eq!(summary["ai_accessible_count"], 2);
    }

    #[actix_web::test]
    async fn test_upload_preserves_folders_and_updates_company() {
        let dir = TempDir::new().unwrap();
        let state = test_support::state(&dir, None);
        let user = state
            .store
            .create_user(NewUser {
                email: "dev@example.com".into(),
                role: Role::Cto,
                auth_user_id: None,
            })
            .await
            .unwrap();
        state
            .store
            .create_company(NewCompany {
                user_id: user.id.clone(),
                name: "Acme".into(),
                description: None,
                industry: None,
                stage: None,
                company_info: None,
                product_overview: None,
                tech_stack: None,
                go_to_market_strategy: None,
                codebase_files: vec!["README.md".into()],
            })
            .await
            .unwrap();
        let app = actix_test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\n{uid}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"directory\"\r\n\r\ncode\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"src/../main.py\"\r\nContent-Type: text/plain\r\n\r\nprint('hi')\r\n\
             --{b}--\r\n",
            b = boundary,
            uid = user.id
        );
        let req = actix_test::TestRequest::post()
            .uri("/api/files/upload")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();
        let resp: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["count"], 1);
        assert_eq!(resp["uploaded_files"][0], "code/src/main.py");

        let stored = state.workspace.read_to_string(&user.id, "code/src/main.py").await.unwrap();
        assert_eq!(stored, "print('hi')");
        let company = state.store.get_company_by_user(&user.id).await.unwrap().unwrap();
        assert_eq!(company.codebase_files, vec!["README.md", "code/src/main.py"]);
    }
}
