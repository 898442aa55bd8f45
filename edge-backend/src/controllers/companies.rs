use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::EdgeError;
use crate::models::{Company, CompanyUpdate, NewCompany};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct SuggestRequest {
    #[serde(default = "default_company_name")]
    name: String,
    #[serde(default)]
    description: String,
}

fn default_company_name() -> String {
    "Your Startup".to_string()
}

/// Copy the company profile into `context.company` of every agent the
/// owner has. Failures are logged; the company write already succeeded.
pub(crate) async fn propagate_to_agents(data: &AppState, company: &Company) {
    let agents = match data.store.get_agents_by_user(&company.user_id).await {
        Ok(agents) => agents,
        Err(e) => {
            log::warn!("Failed to load agents for company context: {}", e);
            return;
        }
    };

    for agent in agents {
        let mut state = match agent.conversation_state {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let context = state
            .entry("context")
            .or_insert_with(|| Value::Object(Map::new()));
        if !context.is_object() {
            *context = Value::Object(Map::new());
        }
        if let Value::Object(context) = context {
            context.insert("company".into(), json!(company));
        }
        if let Err(e) = data
            .store
            .update_agent_conversation(&agent.id, Value::Object(state))
            .await
        {
            log::warn!("Failed to propagate company context to agent {}: {}", agent.id, e);
        }
    }
}

async fn create_company(
    data: web::Data<AppState>,
    body: web::Json<NewCompany>,
) -> Result<HttpResponse, EdgeError> {
    let new_company = body.into_inner();
    if new_company.name.trim().is_empty() {
        return Err(EdgeError::BadRequest("name cannot be empty".to_string()));
    }
    if data.store.get_user(&new_company.user_id).await?.is_none() {
        return Err(EdgeError::NotFound("User not found".to_string()));
    }
    let company = data.store.create_company(new_company).await?;
    propagate_to_agents(&data, &company).await;
    Ok(HttpResponse::Created().json(company))
}

/// The user's company, or `null` when none exists yet.
async fn get_company_by_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    let company = data.store.get_company_by_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(company))
}

async fn update_company(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CompanyUpdate>,
) -> Result<HttpResponse, EdgeError> {
    let company = data
        .store
        .update_company(&path.into_inner(), body.into_inner())
        .await?
        .ok_or_else(|| EdgeError::NotFound("Company not found".to_string()))?;
    propagate_to_agents(&data, &company).await;
    Ok(HttpResponse::Ok().json(company))
}

async fn suggest_context(
    data: web::Data<AppState>,
    body: web::Json<SuggestRequest>,
) -> Result<HttpResponse, EdgeError> {
    let request = body.into_inner();
    let suggestion = data
        .role_chat
        .company_context_suggestions(&request.name, &request.description)
        .await;
    Ok(HttpResponse::Ok().json(suggestion))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/companies")
            .route("", web::post().to(create_company))
            .route("/suggest", web::post().to(suggest_context))
            .route("/user/{user_id}", web::get().to(get_company_by_user))
            .route("/{id}", web::put().to(update_company)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support;
    use crate::models::{NewAgent, NewUser, Role};
    use actix_web::{http::StatusCode, test, App};
    use tempfile::TempDir;

    #[actix_web::test]
    async fn test_company_context_reaches_agents() {
        let dir = TempDir::new().unwrap();
        let state = test_support::state(&dir, None);
        let user = state
            .store
            .create_user(NewUser {
                email: "ivy@example.com".into(),
                role: Role::Ceo,
                auth_user_id: None,
            })
            .await
            .unwrap();
        state
            .store
            .create_agent(NewAgent {
                user_id: user.id.clone(),
                role: Role::Cmo,
                conversation_state: json!({"messages": [], "context": {"user_role": "CEO"}}),
            })
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/companies/user/{}", user.id))
            .to_request();
        let none: Value = test::call_and_read_body_json(&app, req).await;
        assert!(none.is_null());

        let req = test::TestRequest::post()
            .uri("/api/companies")
            .set_json(json!({"user_id": user.id, "name": "Acme", "stage": "idea"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let company: Value = test::read_body_json(resp).await;

        let req = test::TestRequest::put()
            .uri(&format!("/api/companies/{}", company["id"].as_str().unwrap()))
            .set_json(json!({"stage": "prototype"}))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["stage"], "prototype");
        assert_eq!(updated["name"], "Acme");

        let agents = state.store.get_agents_by_user(&user.id).await.unwrap();
        let context = &agents[0].conversation_state["context"];
        assert_eq!(context["user_role"], "CEO");
        assert_eq!(context["company"]["stage"], "prototype");
    }

    #[actix_web::test]
    async fn test_suggest_and_missing_company() {
        let dir = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(test_support::state(&dir, None))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/companies/suggest")
            .set_json(json!({"description": "Scheduling for clinics"}))
            .to_request();
        let draft: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            draft["company_info"],
            "Your Startup is an early-stage startup. Scheduling for clinics"
        );

        let req = test::TestRequest::put()
            .uri("/api/companies/unknown")
            .set_json(json!({"name": "X"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
