use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::EdgeError;
use crate::models::{Role, User};
use crate::orchestrator::with_task_summary;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    role: Role,
    message: String,
}

async fn require_user(data: &web::Data<AppState>, user_id: &str) -> Result<User, EdgeError> {
    data.store
        .get_user(user_id)
        .await?
        .ok_or_else(|| EdgeError::NotFound("User not found".to_string()))
}

async fn list_agents(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    let agents = data.store.get_agents_by_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(agents))
}

async fn chat(
    data: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, EdgeError> {
    let request = body.into_inner();
    if request.message.trim().is_empty() {
        return Err(EdgeError::BadRequest("message cannot be empty".to_string()));
    }
    let reply = data
        .role_chat
        .chat(&request.user_id, request.role, &request.message)
        .await?;
    Ok(HttpResponse::Ok().json(reply))
}

/// Chat routed through the tool-calling turn. The agent's history records
/// the exchange, the tools that ran and any tasks created from the message.
async fn chat_with_tools(
    data: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, EdgeError> {
    let request = body.into_inner();
    if request.message.trim().is_empty() {
        return Err(EdgeError::BadRequest("message cannot be empty".to_string()));
    }
    let user = require_user(&data, &request.user_id).await?;
    let agent = data
        .store
        .get_agents_by_user(&user.id)
        .await?
        .into_iter()
        .find(|a| a.role == request.role)
        .ok_or_else(|| {
            EdgeError::NotFound(format!("No {} agent found for this user", request.role))
        })?;

    let outcome = data.tool_agent.chat(&user.id, &request.message).await?;
    let reply = with_task_summary(&outcome.reply, &outcome.auto_tasks);

    let now = Utc::now().to_rfc3339();
    let tool_results: Vec<Value> = outcome
        .tool_invocations
        .iter()
        .map(|inv| {
            json!({
                "tool": inv.name,
                "success": inv.result.success,
                "result": inv.result.content,
            })
        })
        .collect();

    let message_count = agent.message_count();
    let mut state = match agent.conversation_state {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let mut messages = state
        .get("messages")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    messages.push(json!({"message": request.message, "is_from_user": true, "timestamp": now}));
    messages.push(json!({"message": reply, "is_from_user": false, "timestamp": now}));
    state.insert("messages".into(), Value::Array(messages));
    state.insert("last_message".into(), json!(reply));
    state.insert("last_updated".into(), json!(now));
    state.insert("timestamp".into(), json!(now));
    state.insert("message_count".into(), json!(message_count + 1));
    state.insert("tool_results".into(), json!(tool_results));
    state.insert("auto_tasks".into(), json!(outcome.auto_tasks));
    let state = Value::Object(state);

    data.store
        .update_agent_conversation(&agent.id, state.clone())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "agent_role": request.role,
        "message": reply,
        "conversation_state": state,
    })))
}

async fn get_conversation(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    let agent = data
        .store
        .get_agent(&path.into_inner())
        .await?
        .ok_or_else(|| EdgeError::NotFound("Agent not found".to_string()))?;

    let messages = agent
        .conversation_state
        .get("messages")
        .cloned()
        .unwrap_or_else(|| json!([]));
    Ok(HttpResponse::Ok().json(json!({
        "agent_id": agent.id,
        "role": agent.role,
        "message_count": agent.message_count(),
        "messages": messages,
        "conversation_state": agent.conversation_state,
    })))
}

async fn get_status(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    let user = require_user(&data, &path.into_inner()).await?;
    let agents = data.store.get_agents_by_user(&user.id).await?;

    let mut statuses = Map::new();
    for agent in &agents {
        let state = &agent.conversation_state;
        statuses.insert(
            agent.role.to_string(),
            json!({
                "id": agent.id,
                "role": agent.role,
                "status": if agent.is_active() { "active" } else { "initialized" },
                "message_count": agent.message_count(),
                "last_active": state.get("timestamp").cloned().unwrap_or_else(|| json!(agent.created_at)),
                "recent_topics": agent.topics(),
                "context_summary": state
                    .get("context_summary")
                    .cloned()
                    .unwrap_or_else(|| json!(format!("AI {} ready to assist", agent.role))),
                "sentiment": state.get("sentiment").cloned().unwrap_or_else(|| json!("ready")),
            }),
        );
    }

    Ok(HttpResponse::Ok().json(json!({
        "user_role": user.role,
        "total_agents": agents.len(),
        "active_agents": agents.iter().filter(|a| a.is_active()).count(),
        "agents": statuses,
    })))
}

async fn get_suggestions(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EdgeError> {
    let user = require_user(&data, &path.into_inner()).await?;
    let agents = data.store.get_agents_by_user(&user.id).await?;
    let tasks = data.store.get_tasks(&user.id).await?;

    let (suggestions, context) = data
        .role_chat
        .proactive_suggestions(&user, &agents, &tasks)
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user.id,
        "generated_at": Utc::now().to_rfc3339(),
        "suggestions": suggestions,
        "context": context,
    })))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/agents")
            .route("/chat", web::post().to(chat))
            .route("/chat/tools", web::post().to(chat_with_tools))
            .route("/user/{user_id}", web::get().to(list_agents))
            .route("/user/{user_id}/status", web::get().to(get_status))
            .route("/user/{user_id}/suggestions", web::get().to(get_suggestions))
            .route("/{agent_id}/conversation", web::get().to(get_conversation)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockAiClient;
    use crate::ai::{AiClient, ModelReply, ToolCall};
    use crate::controllers::test_support;
    use crate::models::{NewAgent, NewUser};
    use actix_web::{http::StatusCode, test, App};
    use tempfile::TempDir;

    /// A user plus one agent per remaining seat, as onboarding leaves them.
    async fn seed(state: &web::Data<AppState>, email: &str, role: Role) -> String {
        let user = state
            .store
            .create_user(NewUser {
                email: email.into(),
                role,
                auth_user_id: None,
            })
            .await
            .unwrap();
        for ai_role in Role::others(role) {
            state
                .store
                .create_agent(NewAgent {
                    user_id: user.id.clone(),
                    role: ai_role,
                    conversation_state: json!({"initialized": true, "messages": []}),
                })
                .await
                .unwrap();
        }
        user.id
    }

    #[actix_web::test]
    async fn test_offline_chat_and_status() {
        let dir = TempDir::new().unwrap();
        let state = test_support::state(&dir, None);
        let user_id = seed(&state, "ana@example.com", Role::Ceo).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/agents/chat")
            .set_json(json!({"user_id": user_id, "role": "CTO", "message": "Which tech stack for the MVP?"}))
            .to_request();
        let reply: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["agent_role"], "CTO");
        assert_eq!(reply["conversation_state"]["message_count"], 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/agents/user/{}/status", user_id))
            .to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["total_agents"], 2);
        assert_eq!(status["active_agents"], 1);
        assert_eq!(status["agents"]["CTO"]["status"], "active");
        assert_eq!(status["agents"]["CMO"]["sentiment"], "ready");

        let req = test::TestRequest::get()
            .uri(&format!("/api/agents/user/{}/suggestions", user_id))
            .to_request();
        let suggestions: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(suggestions["suggestions"][0]["type"], "collaboration");

        let missing = test::TestRequest::post()
            .uri("/api/agents/chat")
            .set_json(json!({"user_id": user_id, "role": "CEO", "message": "hi"}))
            .to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_tool_chat_offline_is_unavailable_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let state = test_support::state(&dir, None);
        let user_id = seed(&state, "kim@example.com", Role::Ceo).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/agents/chat/tools")
            .set_json(json!({"user_id": user_id, "role": "CTO", "message": "We must fix the login page"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.store.get_tasks(&user_id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_tool_chat_records_tool_results() {
        let dir = TempDir::new().unwrap();
        let ai = AiClient::Mock(MockAiClient::new(vec![
            Ok(ModelReply::ToolCalls {
                content: None,
                calls: vec![ToolCall::new(
                    "c1",
                    "file_manager",
                    json!({"mode": "write", "path": "notes/plan.md", "content": "# Plan"}),
                )],
            }),
            Ok(ModelReply::Text("Saved notes/plan.md".into())),
        ]));
        let state = test_support::state(&dir, Some(ai));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let user_id = seed(&state, "jo@example.com", Role::Ceo).await;

        let req = test::TestRequest::post()
            .uri("/api/agents/chat/tools")
            .set_json(json!({"user_id": user_id, "role": "CTO", "message": "Save our plan to notes"}))
            .to_request();
        let reply: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["message"], "Saved notes/plan.md");
        assert_eq!(reply["conversation_state"]["tool_results"][0]["tool"], "file_manager");
        assert_eq!(reply["conversation_state"]["tool_results"][0]["success"], true);

        let written = state.workspace.read_to_string(&user_id, "notes/plan.md").await.unwrap();
        assert_eq!(written, "# Plan");
    }

    #[actix_web::test]
    async fn test_tool_chat_lists_extracted_tasks_after_reply() {
        let dir = TempDir::new().unwrap();
        let ai = AiClient::Mock(MockAiClient::texts(&["  Sure thing.  "]));
        let state = test_support::state(&dir, Some(ai));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let user_id = seed(&state, "lee@example.com", Role::Ceo).await;

        let req = test::TestRequest::post()
            .uri("/api/agents/chat/tools")
            .set_json(json!({"user_id": user_id, "role": "CTO", "message": "Please fix the login"}))
            .to_request();
        let reply: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            reply["message"],
            "Sure thing.\n\nI've added the following tasks:\n\u{2022} Fix the login"
        );
        assert_eq!(reply["conversation_state"]["auto_tasks"][0], "Fix the login");
        assert_eq!(reply["conversation_state"]["last_message"], reply["message"]);

        let tasks = state.store.get_tasks(&user_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Fix the login");
    }
}
