use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::EdgeError;
use crate::models::{NewAgent, NewUser, Role};
use crate::AppState;

/// Create a user, one agent per remaining seat, and their starter tasks.
async fn onboard(
    data: web::Data<AppState>,
    body: web::Json<NewUser>,
) -> Result<HttpResponse, EdgeError> {
    let mut new_user = body.into_inner();
    new_user.email = new_user.email.trim().to_string();
    if new_user.email.is_empty() || !new_user.email.contains('@') {
        return Err(EdgeError::BadRequest("A valid email is required".to_string()));
    }

    if data.store.get_user_by_email(&new_user.email).await?.is_some() {
        return Err(EdgeError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let user = data.store.create_user(new_user).await?;
    log::info!("Onboarded user {} as {}", user.id, user.role);

    for ai_role in Role::others(user.role) {
        data.store
            .create_agent(NewAgent {
                user_id: user.id.clone(),
                role: ai_role,
                conversation_state: json!({
                    "initialized": true,
                    "messages": [],
                    "context": { "user_role": user.role }
                }),
            })
            .await?;
    }

    let tasks = data.role_chat.seed_initial_tasks(&user).await;
    log::info!("Created {} initial task(s) for user {}", tasks.len(), user.id);

    Ok(HttpResponse::Created().json(user))
}

async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    match data.store.get_user(&path.into_inner()).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(EdgeError::NotFound("User not found".to_string())),
    }
}

async fn get_user_by_email(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    match data.store.get_user_by_email(&path.into_inner()).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(EdgeError::NotFound("User not found".to_string())),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("/onboard", web::post().to(onboard))
            .route("/email/{email}", web::get().to(get_user_by_email))
            .route("/{id}", web::get().to(get_user)),
    );
}
