use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)));
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "AI Startup Assistant API",
        "status": "running",
        "version": VERSION
    }))
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store = if state.config.database_url.is_some() {
        "sqlite"
    } else {
        "in_memory"
    };
    let model = match &state.ai {
        Some(client) => client.model_name().to_string(),
        None => "offline".to_string(),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": VERSION,
        "services": {
            "store": store,
            "language_model": model,
            "tools": state.tool_registry.len()
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_offline_mode() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = test::init_service(App::new().app_data(test_support::state(&dir, None)).configure(config)).await;

        let resp: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp["status"], "healthy");
        assert_eq!(resp["services"]["language_model"], "offline");
        assert_eq!(resp["services"]["store"], "in_memory");

        let resp: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp["status"], "running");
    }
}
