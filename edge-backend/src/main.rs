use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod ai;
mod config;
mod controllers;
mod db;
mod error;
mod http;
mod models;
mod orchestrator;
mod tools;
mod workers;
mod workspace;

use ai::AiClient;
use config::Config;
use db::Store;
use orchestrator::{RoleChat, ToolAgent};
use tools::{ToolRegistry, ToolSettings};
use workers::TaskCompletionWorker;
use workspace::WorkspaceResolver;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub workspace: Arc<WorkspaceResolver>,
    pub tool_registry: Arc<ToolRegistry>,
    pub ai: Option<Arc<AiClient>>,
    pub tool_agent: Arc<ToolAgent>,
    pub role_chat: Arc<RoleChat>,
}

impl AppState {
    /// Wire the shared services. The tool registry is assembled once here and
    /// only read afterwards.
    pub fn new(config: Config, store: Arc<dyn Store>, ai: Option<Arc<AiClient>>) -> Self {
        let workspace = Arc::new(WorkspaceResolver::new(config.workspace_root.clone()));
        let tool_registry = Arc::new(tools::create_default_registry());
        let tool_agent = Arc::new(ToolAgent::new(
            ai.clone(),
            tool_registry.clone(),
            store.clone(),
            workspace.clone(),
            ToolSettings::from(&config),
        ));
        let role_chat = Arc::new(RoleChat::new(ai.clone(), store.clone()));

        AppState {
            config,
            store,
            workspace,
            tool_registry,
            ai,
            tool_agent,
            role_chat,
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let port = config.port;

    let store = db::open_store(&config)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize store: {}", e)))?;

    let ai = AiClient::from_config(&config).map(Arc::new);
    match &ai {
        Some(client) => log::info!("Language model configured: {}", client.model_name()),
        None => log::warn!("OPENAI_API_KEY not set, running in offline mode"),
    }

    std::fs::create_dir_all(&config.workspace_root)?;
    log::info!("Workspace root: {}", config.workspace_root.display());

    let state = web::Data::new(AppState::new(config, store, ai));
    log::info!("Registered {} tools", state.tool_registry.len());

    // Background completion of pending tasks
    let shutdown = CancellationToken::new();
    let worker = TaskCompletionWorker::new(
        state.store.clone(),
        state.workspace.clone(),
        state.ai.clone(),
        Duration::from_secs(state.config.task_poll_interval_secs.max(1)),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    log::info!("Starting EDGE backend on port {}", port);

    let server_state = state.clone();
    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(server_state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::users::config)
            .configure(controllers::agents::config)
            .configure(controllers::tasks::config)
            .configure(controllers::files::config)
            .configure(controllers::companies::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        log::warn!("[TASK_WORKER] did not shut down cleanly: {}", e);
    }

    result
}
