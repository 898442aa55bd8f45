use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::str::FromStr;

use crate::error::EdgeError;
use crate::models::{NewTask, Role, TaskStatus, TaskUpdate};
use crate::AppState;

#[derive(Deserialize)]
struct ListQuery {
    status: Option<TaskStatus>,
}

async fn create_task(
    data: web::Data<AppState>,
    body: web::Json<NewTask>,
) -> Result<HttpResponse, EdgeError> {
    let new_task = body.into_inner();
    if new_task.description.trim().is_empty() {
        return Err(EdgeError::BadRequest("description cannot be empty".to_string()));
    }
    if data.store.get_user(&new_task.user_id).await?.is_none() {
        return Err(EdgeError::NotFound("User not found".to_string()));
    }
    let task = data.store.create_task(new_task).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Tasks for a user, newest first (optional ?status=pending filter)
async fn list_user_tasks(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, EdgeError> {
    let mut tasks = data.store.get_tasks(&path.into_inner()).await?;
    if let Some(status) = query.status {
        tasks.retain(|t| t.status == status);
    }
    Ok(HttpResponse::Ok().json(tasks))
}

async fn update_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<TaskUpdate>,
) -> Result<HttpResponse, EdgeError> {
    let update = body.into_inner();
    if update.is_empty() {
        return Err(EdgeError::BadRequest("No fields to update".to_string()));
    }
    match data.store.update_task(&path.into_inner(), update).await? {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(EdgeError::NotFound("Task not found".to_string())),
    }
}

async fn delete_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    if data.store.delete_task(&path.into_inner()).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(EdgeError::NotFound("Task not found".to_string()))
    }
}

async fn list_role_tasks(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, EdgeError> {
    let (role, user_id) = path.into_inner();
    let role = Role::from_str(&role)
        .map_err(|_| EdgeError::BadRequest(format!("Unknown role: {}", role)))?;
    let mut tasks = data.store.get_tasks(&user_id).await?;
    tasks.retain(|t| t.assigned_to_role == role);
    Ok(HttpResponse::Ok().json(tasks))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::post().to(create_task))
            .route("/user/{user_id}", web::get().to(list_user_tasks))
            .route("/role/{role}/user/{user_id}", web::get().to(list_role_tasks))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    );
}
